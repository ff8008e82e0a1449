use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::models::AuthResult;
use crate::token;

/// Entries are treated as stale this long before the access token expires
const EXPIRY_MARGIN_SECONDS: i64 = 30;

/// Cache of `get_token` results keyed by the refresh token that produced them
///
/// Owned by one `PassageClient`; rebuilding the client on a configuration
/// change starts with an empty cache. Tokens without an `exp` claim are never
/// cached.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    entries: Mutex<HashMap<String, CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    result: AuthResult,
    stale_at: DateTime<Utc>,
}

impl TokenCache {
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<AuthResult> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.stale_at > now => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `result` under `key`, dropping every entry that has gone stale
    pub fn insert(&self, key: &str, result: &AuthResult) {
        self.insert_at(key, result, Utc::now());
    }

    fn insert_at(&self, key: &str, result: &AuthResult, now: DateTime<Utc>) {
        let Some(expires_at) = token::expires_at(&result.access_token) else {
            return;
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, entry| entry.stale_at > now);
            entries.insert(
                key.to_string(),
                CachedToken {
                    result: result.clone(),
                    stale_at: expires_at - Duration::seconds(EXPIRY_MARGIN_SECONDS),
                },
            );
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}
