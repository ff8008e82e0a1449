//! The handshake state machine
//!
//! `Start → Classified → Exchanged → UserResolved → TicketBuilt → Completed`,
//! or `Failed` from any of them. Each step waits for the previous one; the
//! only suspension points are the provider calls and the hooks. Nothing is
//! retried: a failure is final for the request.

use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::credential::{Credential, InboundRequest};
use super::events::EventHooks;
use super::failure::FailureReason;
use super::ticket::{ClaimSet, Ticket};
use crate::cancel::CancellationScope;
use crate::client::{AuthResult, IdentityApi};
use crate::config::{ClientSnapshot, Configuration};
use crate::token;
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Classified,
    Exchanged,
    UserResolved,
    TicketBuilt,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SignInError(pub String);

/// The hosting layer's side of a handshake: turn a ticket into a session
#[async_trait]
pub trait SignIn: Send + Sync {
    /// Establish a session for `ticket`
    ///
    /// # Errors
    /// Returns an error if the host refuses or cannot persist the session.
    async fn sign_in(&self, ticket: &Ticket) -> Result<(), SignInError>;
}

/// Result of one handshake
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// Correlation id used in this handshake's log lines
    pub id: String,
    pub result: Result<Ticket, FailureReason>,
    /// Every state visited, `Start` first and `Completed` or `Failed` last
    pub trace: Vec<Stage>,
}

impl HandshakeOutcome {
    #[must_use]
    pub fn final_stage(&self) -> Stage {
        self.trace.last().copied().unwrap_or(Stage::Start)
    }
}

/// Runs handshakes against one configuration snapshot
#[derive(Clone)]
pub struct HandshakeStateMachine {
    config: Arc<Configuration>,
    api: Arc<dyn IdentityApi>,
    hooks: EventHooks,
    generation: Option<u64>,
}

impl fmt::Debug for HandshakeStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeStateMachine")
            .field("app_id", &self.config.app_id)
            .field("hooks", &self.hooks)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

struct Run {
    id: String,
    trace: Vec<Stage>,
}

impl Run {
    fn advance(&mut self, stage: Stage) {
        self.trace.push(stage);
    }
}

impl HandshakeStateMachine {
    #[must_use]
    pub fn new(config: Arc<Configuration>, api: Arc<dyn IdentityApi>, hooks: EventHooks) -> Self {
        Self {
            config,
            api,
            hooks,
            generation: None,
        }
    }

    /// Bind a machine to the configuration and client of one snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &ClientSnapshot, hooks: EventHooks) -> Self {
        Self {
            config: Arc::clone(&snapshot.config),
            api: Arc::new(snapshot.client.clone()),
            hooks,
            generation: Some(snapshot.generation),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Drive one handshake to a terminal state
    pub async fn run(
        &self,
        request: &InboundRequest,
        sign_in: &dyn SignIn,
        cancel: &CancellationScope,
    ) -> HandshakeOutcome {
        let mut run = Run {
            id: uuid::Uuid::new_v4().to_string(),
            trace: vec![Stage::Start],
        };
        LoggingHelper::log_handshake_start(&run.id, self.generation);

        let result = self.drive(&mut run, request, sign_in, cancel).await;
        match &result {
            Ok(ticket) => {
                run.advance(Stage::Completed);
                LoggingHelper::log_ticket_issued(
                    &run.id,
                    ticket.subject().unwrap_or_default(),
                    ticket.principal.len(),
                );
            }
            Err(reason) => {
                run.advance(Stage::Failed);
                LoggingHelper::log_handshake_failed(&run.id, reason);
            }
        }

        HandshakeOutcome {
            id: run.id,
            result,
            trace: run.trace,
        }
    }

    async fn drive(
        &self,
        run: &mut Run,
        request: &InboundRequest,
        sign_in: &dyn SignIn,
        cancel: &CancellationScope,
    ) -> Result<Ticket, FailureReason> {
        // Start → Classified
        let credential = Credential::classify(request, &self.config.cookie_name);
        LoggingHelper::log_credential_classified(&run.id, &credential);
        if credential == Credential::None {
            return Err(FailureReason::NoCredential);
        }
        run.advance(Stage::Classified);
        ensure_live(cancel)?;

        // Classified → Exchanged
        let auth = self.exchange(&run.id, credential, cancel).await?;
        let subject = token::subject(&auth.access_token).ok_or(FailureReason::InvalidToken)?;
        run.advance(Stage::Exchanged);
        ensure_live(cancel)?;

        // Exchanged → UserResolved
        LoggingHelper::log_user_lookup(&run.id, &subject);
        let user = self
            .api
            .get_user(&subject, &auth.access_token, cancel)
            .await
            .map_err(|e| FailureReason::from_lookup(&e, &subject))?;
        run.advance(Stage::UserResolved);

        // UserResolved → TicketBuilt
        let ticket = Ticket::build(
            &self.config.sign_in_scheme,
            ClaimSet::for_user(&subject, &user),
            &auth,
            self.config.save_tokens,
            Utc::now(),
        );
        run.advance(Stage::TicketBuilt);

        // TicketBuilt → Completed
        let ticket = self
            .hooks
            .ticket_received(ticket)
            .await
            .map_err(|e| FailureReason::HookError(e.to_string()))?;
        ensure_live(cancel)?;
        sign_in
            .sign_in(&ticket)
            .await
            .map_err(|e| FailureReason::SignInRejected(e.to_string()))?;
        self.hooks
            .ticket_accepted(&ticket)
            .await
            .map_err(|e| FailureReason::HookError(e.to_string()))?;

        Ok(ticket)
    }

    async fn exchange(
        &self,
        handshake_id: &str,
        credential: Credential,
        cancel: &CancellationScope,
    ) -> Result<AuthResult, FailureReason> {
        let kind = credential.kind();
        match credential {
            Credential::MagicLink(token) | Credential::VerifyLink(token) => {
                LoggingHelper::log_exchange_start(handshake_id, kind);
                let auth = self
                    .api
                    .complete_magic_link(&token, cancel)
                    .await
                    .map_err(|e| FailureReason::from_exchange(&e))?;
                LoggingHelper::log_exchange_summary(handshake_id, &auth);
                Ok(auth)
            }
            // The cookie already holds an access token; no network exchange
            Credential::BearerCookie(token) => Ok(AuthResult {
                access_token: token,
                ..AuthResult::default()
            }),
            Credential::None => Err(FailureReason::NoCredential),
        }
    }
}

fn ensure_live(cancel: &CancellationScope) -> Result<(), FailureReason> {
    if cancel.is_cancelled() {
        Err(FailureReason::Cancelled)
    } else {
        Ok(())
    }
}
