// In-memory sessions for the demo host, plus the userinfo and sign-out handlers
use actix_web::{cookie::Cookie, web, HttpRequest, HttpResponse, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::cancel::CancellationScope;
use crate::config::ConfigStore;
use crate::handshake::ticket::{properties, TICKET_LIFETIME_MINUTES};
use crate::handshake::{ClaimSet, SignIn, SignInError, Ticket};
use crate::utils::cookie_utils::{
    build_cookie, create_expired_cookie, extract_cookie_value, CookieOptions, SESSION_COOKIE,
};
use crate::utils::responses::ResponseBuilder;

/// A signed-in user as the host remembers it
#[derive(Debug, Clone, Serialize)]
pub struct StoredSession {
    pub subject: String,
    pub scheme: String,
    pub claims: ClaimSet,
    /// Ticket properties minus any saved tokens
    pub properties: BTreeMap<String, String>,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn from_ticket(ticket: &Ticket) -> Result<Self, SignInError> {
        let subject = ticket
            .subject()
            .ok_or_else(|| SignInError("Ticket has no subject".to_string()))?
            .to_string();
        let expires_at = ticket
            .property(properties::EXPIRES)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map_or_else(
                || Utc::now() + Duration::minutes(TICKET_LIFETIME_MINUTES),
                |value| value.with_timezone(&Utc),
            );
        let visible = ticket
            .properties
            .iter()
            .filter(|(key, _)| !key.starts_with(".Token"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            subject,
            scheme: ticket.scheme.clone(),
            claims: ticket.principal.clone(),
            properties: visible,
            refresh_token: ticket.property(properties::REFRESH_TOKEN).map(str::to_string),
            expires_at,
        })
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Server-side session table keyed by the `passage_session` cookie value
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    cookie_secure: bool,
}

impl SessionStore {
    #[must_use]
    pub fn new(cookie_secure: bool) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            cookie_secure,
        }
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Store a session for `ticket` and return its id
    ///
    /// # Errors
    /// Returns an error if the ticket carries no subject.
    pub fn create(&self, ticket: &Ticket) -> Result<String, SignInError> {
        let session = StoredSession::from_ticket(ticket)?;
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), session);
        Ok(id)
    }

    /// Look up a live session; expired entries are dropped on the way
    #[must_use]
    pub fn get(&self, id: &str) -> Option<StoredSession> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(id) {
            Some(session) if session.is_expired(Utc::now()) => {
                debug!("Session {id} expired");
                sessions.remove(id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    pub fn remove(&self, id: &str) -> Option<StoredSession> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cookie carrying a session id
    #[must_use]
    pub fn session_cookie(&self, id: &str) -> Cookie<'static> {
        let options = CookieOptions {
            secure: self.cookie_secure,
            max_age: actix_web::cookie::time::Duration::minutes(TICKET_LIFETIME_MINUTES),
            ..CookieOptions::default()
        };
        build_cookie(SESSION_COOKIE, id.to_string(), &options)
    }

    #[must_use]
    pub fn expired_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(SESSION_COOKIE, self.cookie_secure)
    }
}

/// `SignIn` that persists the ticket into a `SessionStore` and remembers the
/// new session id for the response cookie
pub struct SessionSignIn<'a> {
    store: &'a SessionStore,
    session_id: Mutex<Option<String>>,
}

impl<'a> SessionSignIn<'a> {
    #[must_use]
    pub fn new(store: &'a SessionStore) -> Self {
        Self {
            store,
            session_id: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SignIn for SessionSignIn<'_> {
    async fn sign_in(&self, ticket: &Ticket) -> Result<(), SignInError> {
        let id = self.store.create(ticket)?;
        *self.session_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        Ok(())
    }
}

/// Userinfo endpoint - returns the claims of the current session
///
/// # Errors
/// Never fails; a missing or expired session yields a 401 response
pub async fn passage_userinfo(
    req: HttpRequest,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let session = extract_cookie_value(&req, SESSION_COOKIE).and_then(|id| sessions.get(&id));
    Ok(session.map_or_else(
        || {
            debug!("Userinfo endpoint: no live passage session");
            ResponseBuilder::unauthorized().build()
        },
        |session| HttpResponse::Ok().json(session),
    ))
}

/// Sign out - drops the session and clears both Passage cookies
///
/// When the session saved a refresh token and an API key is configured, the
/// user's refresh tokens are revoked as well; a failed revocation is logged
/// and does not block the sign-out.
///
/// # Errors
/// Never fails; the response is always a redirect to `/`
pub async fn passage_sign_out(
    req: HttpRequest,
    sessions: web::Data<SessionStore>,
    store: web::Data<ConfigStore>,
) -> Result<HttpResponse> {
    let snapshot = store.current();
    let removed = extract_cookie_value(&req, SESSION_COOKIE).and_then(|id| sessions.remove(&id));

    if let Some(session) = &removed {
        info!("Signing out Passage user {}", session.subject);
        if session.refresh_token.is_some() && snapshot.config.api_key().is_some() {
            let cancel = CancellationScope::new();
            let _guard = cancel.drop_guard();
            if let Err(e) = snapshot
                .client
                .management()
                .revoke_user_refresh_tokens(&session.subject, &cancel)
                .await
            {
                warn!("Failed to revoke refresh tokens for {}: {e}", session.subject);
            }
        }
    }

    Ok(ResponseBuilder::redirect("/")
        .with_cookie(sessions.expired_cookie())
        .with_cookie(create_expired_cookie(
            &snapshot.config.cookie_name,
            sessions.cookie_secure(),
        ))
        .build())
}
