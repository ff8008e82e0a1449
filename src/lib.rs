#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Passage passwordless authentication for actix-web hosts
//!
//! The core is the [`HandshakeStateMachine`]: it turns an inbound callback
//! request carrying a magic link, verify link or auth token cookie into a
//! [`Ticket`] of claims, using a [`PassageClient`] bound to one immutable
//! [`Configuration`] snapshot held by the [`ConfigStore`].

/// Version of the passage-auth library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cancel;
pub mod client;
pub mod config;
pub mod handlers;
pub mod handshake;
pub mod settings;
pub mod token;
pub mod utils;

/// Re-export commonly used items
pub use cancel::CancellationScope;
pub use client::{ApiError, ApiErrorKind, IdentityApi, PassageClient};
pub use config::{ClientSnapshot, ConfigError, ConfigStore, Configuration};
pub use handlers::{configure_services, SessionStore};
pub use handshake::{
    EventHooks, FailureReason, HandshakeEvents, HandshakeOutcome, HandshakeStateMachine,
    InboundRequest, SignIn, Ticket,
};
pub use settings::PassageSettings;
