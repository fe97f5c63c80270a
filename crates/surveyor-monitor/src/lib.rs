//! # surveyor-monitor
//!
//! The monitoring pipeline: journal lines in, scored durable systems out.
//!
//! - **Tracker**: [`SystemTracker`] holds the focused system, applies
//!   classified events, scores bodies as surveys qualify, and decides
//!   when to persist.
//! - **Replay**: [`prime`] drains historical journal files into the
//!   tracker before live following starts.
//! - **Follow**: [`follow`] tails the live journal and hops to the next
//!   file on rotation.
//! - **Errors**: [`MonitorError`] via `thiserror`, wrapping the journal
//!   and store error types.

#![deny(unsafe_code)]

pub mod errors;
pub mod follow;
pub mod replay;
pub mod tracker;

pub use errors::{MonitorError, Result};
pub use follow::follow;
pub use replay::prime;
pub use tracker::SystemTracker;
