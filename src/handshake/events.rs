//! Handshake extension points
//!
//! Both hooks default to no-ops. Hooks run in registration order; the first
//! error stops the chain and the handshake fails with `HookError`.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::ticket::Ticket;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Callbacks fired around sign-in
///
/// Report failure by returning `HookError`. A panicking hook is not caught:
/// it unwinds out of the handshake, and with the release profile's
/// `panic = "abort"` it ends the process.
#[async_trait]
pub trait HandshakeEvents: Send + Sync {
    /// Called with the freshly built ticket before sign-in; may return a
    /// replacement
    ///
    /// # Errors
    /// Returns an error to abort the handshake before sign-in.
    async fn on_ticket_received(&self, ticket: Ticket) -> Result<Ticket, HookError> {
        Ok(ticket)
    }

    /// Called after the hosting layer accepted the ticket
    ///
    /// # Errors
    /// An error fails the handshake even though sign-in already happened.
    async fn on_ticket_accepted(&self, _ticket: &Ticket) -> Result<(), HookError> {
        Ok(())
    }
}

/// Ordered list of registered hooks
#[derive(Clone, Default)]
pub struct EventHooks {
    hooks: Vec<Arc<dyn HandshakeEvents>>,
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

impl EventHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, hook: Arc<dyn HandshakeEvents>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn push(&mut self, hook: Arc<dyn HandshakeEvents>) {
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) async fn ticket_received(&self, mut ticket: Ticket) -> Result<Ticket, HookError> {
        for hook in &self.hooks {
            ticket = hook.on_ticket_received(ticket).await?;
        }
        Ok(ticket)
    }

    pub(crate) async fn ticket_accepted(&self, ticket: &Ticket) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.on_ticket_accepted(ticket).await?;
        }
        Ok(())
    }
}
