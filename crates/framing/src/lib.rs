//! Turns the raw byte stream of a serial session into text lines.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod lines;

pub use lines::{LineFramer, Lines};
