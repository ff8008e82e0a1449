//! Passage authentication handshake
//!
//! Turns an inbound callback request into a `Ticket` or a classified
//! `FailureReason`: classify the credential, exchange it for tokens, resolve
//! the user, assemble claims, run the event hooks and hand the ticket to the
//! host's `SignIn`.

pub mod credential;
pub mod events;
pub mod failure;
pub mod machine;
pub mod ticket;

pub use credential::{Credential, InboundRequest, MAGIC_LINK_PARAM, VERIFY_LINK_PARAM};
pub use events::{EventHooks, HandshakeEvents, HookError};
pub use failure::FailureReason;
pub use machine::{HandshakeOutcome, HandshakeStateMachine, SignIn, SignInError, Stage};
pub use ticket::{claim_types, Claim, ClaimSet, Ticket};
