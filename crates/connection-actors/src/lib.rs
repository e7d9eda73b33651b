//! # Connection Actors
//!
//! The serial link manager.
//!
//! ## Actors
//!
//! - **LinkActor**: owns the one serial link. Discovery, permission
//!   handling, connect/disconnect, line framing of received bytes and the
//!   fixed-interval reconnect timer.
//!
//! ## Supporting pieces
//!
//! - **ReconnectScheduler**: single outstanding reconnect timer
//! - **LinkConfig**: runtime settings, defaults from [`constants`]

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod config;
pub mod constants;
pub mod link_actor;
pub mod reconnect;
mod session;

pub use config::LinkConfig;
pub use link_actor::LinkActor;
pub use reconnect::ReconnectScheduler;
