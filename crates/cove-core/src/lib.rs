//! Conversation/message synchronization and caching core of a
//! decentralized-identity messaging client.
//!
//! The crate ingests decoded messages, deduplicates and time-orders them
//! against local storage, keeps per-conversation aggregates (unread counts,
//! previews, mentions) consistent, and defers messages whose cryptographic
//! prerequisites are not resolvable yet, replaying them on readiness.
//! Transport, crypto and identity resolution stay behind the [`collab`]
//! traits.

pub mod bus;
pub mod collab;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod models;
pub mod store;

pub use bus::{Action, EventBus, Notification};
pub use collab::{Directory, Messenger};
pub use config::CoreConfig;
pub use context::CoreContext;
pub use error::{StoreError, StoreResult};
pub use ingest::{Aggregator, DefaultHiddenPolicy, HiddenPolicy, ReceiptTracker, Shield, Vestibule};
