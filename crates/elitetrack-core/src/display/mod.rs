//! Markdown formatting for records, collections and operation results.
//!
//! Domain models implement [`std::fmt::Display`] directly ([`models`]);
//! collections and operation outcomes are formatted through newtype wrappers
//! ([`collections`], [`results`]). Everything renders as markdown for the
//! CLI's terminal renderer.

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;

pub use collections::{Messages, ProjectSummaries, Quotes};
pub use datetime::{LocalDateTime, MaybeDate};
pub use results::{CreateResult, Persistence, UpdateResult};
