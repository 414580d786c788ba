//! PropSync — third-party integration connectors for property management.
//!
//! Integrates external vendors (background-check providers, maintenance
//! vendors, document storage, ...) behind a uniform connector lifecycle:
//! initialize → connect → sync ⇄ disconnect.
//!
//! # Architecture
//!
//! ```text
//! Provider API (TransUnion, Experian, ...)
//!          ↑ submit / health / results        ↓ completion webhooks
//! ┌─────────────────────────────────────────┐
//! │     Connector (implements trait)         │
//! │  - validate credentials                  │
//! │  - test connection                       │
//! │  - submit pending work in batches        │
//! └─────────────────────────────────────────┘
//!          ↕ lifecycle state machine
//! ┌─────────────────────────────────────────┐
//! │     ConnectorInstance + Registry         │
//! │  - status / retry bookkeeping            │
//! │  - directory keyed by (type, provider)   │
//! │  - bulk initialize / sync-all            │
//! └─────────────────────────────────────────┘
//!          ↕
//!   HTTP API (axum) + SyncScheduler
//! ```
//!
//! # Core types
//!
//! - [`Connector`] — trait each integration implements
//! - [`ConnectorInstance`] — lifecycle driver owning one [`ConnectorConfig`]
//! - [`ConnectorRegistry`] — directory of live instances
//! - [`SyncResult`] / [`WebhookPayload`] — sync outcomes and inbound events
//! - [`next_sync_time`] / [`should_retry`] — scheduling and retry policy

pub mod api;
pub mod config;
pub mod connector;
pub mod connectors;
pub mod registry;
pub mod schedule;
pub mod scheduler;

// Re-export public types
pub use config::{
    ConnectorConfig, ConnectorStatus, ConnectorType, SyncFrequency, SyncResult, WebhookPayload,
};
pub use connector::{Connector, ConnectorInstance};
pub use registry::ConnectorRegistry;
pub use schedule::{next_sync_time, should_retry};
pub use scheduler::SyncScheduler;
