//! # Actor Protocol
//!
//! Message and state definitions shared by the link and alert actors.
//!
//! This crate has no runtime dependencies (no tokio, no serial I/O), so the
//! state machine and event types are testable on their own.
//!
//! ## Architecture
//!
//! - **ConnectionState**: link FSM (pure logic, no side effects)
//! - **SystemEvent**: messages from the actor system to the presentation layer
//! - **ActorError**: error type returned by actor handlers
//!
//! ## Message Flow
//!
//! ```text
//! transport bytes → LinkActor ──AlertMessage::Line──→ AlertActor
//!                       ↓                                  ↓
//!     SystemEvent::StateChanged / Log / LineReceived   SystemEvent::AlertTriggered
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod errors;
pub mod messages;
pub mod state;

pub use errors::ActorError;
pub use messages::SystemEvent;
pub use state::ConnectionState;
