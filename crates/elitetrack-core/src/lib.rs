//! Core library for the EliteTrack armoring workshop tracker.
//!
//! This crate keeps the state of an armoring session (projects with their
//! step timelines, project conversations and quote requests) and applies
//! every change optimistically: guards run first, the new state is visible
//! at once, and the store write follows on an ordered outbox. Records created
//! locally carry provisional ids until the store answers, at which point they
//! are reconciled with their canonical copies.
//!
//! # Layers
//!
//! - **Models** ([`models`]): plain serde records and their status enums
//! - **Rules** ([`timeline`], [`models::QuoteRecord::apply`]): pure guards and
//!   transitions
//! - **Reconciliation** ([`reconcile`]): provisional/canonical identity and
//!   collection merges
//! - **Controller** ([`controller`]): the session object UI code talks to
//! - **Ports** ([`gateway`], [`push`], [`cache`], [`blob`], [`clock`]): traits
//!   for everything outside the process, with SQLite and in-process
//!   implementations ([`db`])
//! - **Display** ([`display`]): markdown formatting for the CLI renderer
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use elitetrack_core::{
//!     models::{Actor, RecordId, Role},
//!     params::NewProject,
//!     ProjectStateController, SqliteGateway,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(SqliteGateway::open("tracker.db").await?);
//!
//! let controller = ProjectStateController::builder()
//!     .with_actor(Actor::new("exe_1", "Carlos", Role::Executor))
//!     .with_gateway(gateway.clone())
//!     .with_directory(gateway)
//!     .build()
//!     .await?;
//!
//! // The project is visible right away under a provisional id
//! let pending = controller
//!     .create_project(NewProject {
//!         client_id: RecordId::new("cli_1"),
//!         vehicle_id: RecordId::new("veh_1"),
//!         qr_code: "QR-0001".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! // and gets its canonical id once the store accepted it
//! pending.settled().await?;
//! for project in controller.projects() {
//!     println!("{project}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod cache;
pub mod clock;
pub mod controller;
pub mod db;
pub mod display;
pub mod error;
pub mod gateway;
pub mod models;
pub mod params;
pub mod push;
pub mod reconcile;
pub mod timeline;

// Re-export commonly used types
pub use blob::{BlobStore, FsBlobStore};
pub use cache::{DurableCache, MemoryCache, SqliteCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{
    ControllerBuilder, Notice, NoticeKind, PendingWrite, ProjectStateController, SessionState,
};
pub use db::SqliteGateway;
pub use display::{CreateResult, Messages, Persistence, ProjectSummaries, Quotes, UpdateResult};
pub use error::{Result, TrackerError};
pub use gateway::{DirectoryLookup, PersistenceGateway};
pub use params::{NewProject, NewQuote};
pub use push::{InProcessBridge, PushEvent, RealtimePushBridge, ScopeId};
