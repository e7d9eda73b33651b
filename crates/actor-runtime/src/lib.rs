//! # Actor Runtime
//!
//! Runtime infrastructure for the link and alert actors.
//!
//! This crate defines:
//! - **Actor trait**: Base trait for all actors with lifecycle methods
//! - **Channels**: typed inbound events and the [`LinkHandle`] front door
//! - **Supervision**: cancellable single-shot timers
//! - **Logging**: `actor_*!` macros over `tracing`
//!
//! ## Architecture
//!
//! The actor runtime follows these principles:
//! - **Zero shared state**: Each actor owns its data
//! - **Message passing**: Actors communicate via typed messages
//! - **Sequential processing**: Messages are handled one at a time
//! - **Failure isolation**: Actor errors don't crash the system
//!
//! ## Example
//!
//! ```ignore
//! use actor_runtime::{spawn_actor, LinkHandle};
//!
//! let (link, handles) = LinkHandle::new();
//!
//! let actor = LinkActor::new(
//!     provider,
//!     config,
//!     handles.state.clone(),
//!     link.link_sender(),
//!     handles.event_tx.clone(),
//! );
//! spawn_actor(actor, handles.link_rx, handles.event_tx.clone());
//!
//! link.connect(device, LinkParams::default()).await;
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod channels;
pub mod logging;
pub mod supervision;

pub use actor::{spawn_actor, Actor};
pub use channels::{ActorHandles, AlertMessage, LinkHandle, LinkMessage, StateCell};
pub use supervision::{spawn_timeout, SupervisionConfig, TimeoutHandle};

#[doc(hidden)]
pub use tracing as __tracing;
