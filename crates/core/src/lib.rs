//! # Promethios Core
//!
//! Domain types, traits, and error definitions for the Promethios governance
//! runtime. This crate has **zero framework dependencies** — it defines the
//! shapes every other crate threads through the system:
//!
//! - [`RequestOptions`], the unit of work that flows from an agent through the
//!   governance pipeline into a provider adapter
//! - [`Provider`], the capability of completing a chat request
//! - [`InterventionRecord`], the audit trace a governance plugin leaves behind
//! - [`GovernanceEvent`] and [`EventObserver`], the injected observability seam
//!
//! ## Design Philosophy
//!
//! Every collaborator is a trait here; implementations live in their own
//! crates. Tests swap in mock providers and recording observers without
//! touching global state.

pub mod error;
pub mod event;
pub mod intervention;
pub mod message;
pub mod provider;
pub mod request;

// Re-export key types at crate root for ergonomics
pub use error::ProviderError;
pub use event::{EventBus, EventObserver, GovernanceEvent, NoopObserver, TracingObserver};
pub use intervention::{InterventionRecord, Severity};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderResponse, Usage};
pub use request::RequestOptions;
