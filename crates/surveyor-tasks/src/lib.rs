//! # surveyor-tasks
//!
//! Background-work primitives shared across the surveyor crates.
//!
//! - **Rate limiting**: [`RateLimiter`] grants one token per period, with a
//!   cancellable exponential-backoff [`RateLimiter::wait`].
//! - **Serial execution**: [`SerialExecutor`] owns mutable state on a
//!   dedicated worker thread and linearizes closures against it.
//! - **Errors**: [`ExecutorError`] via `thiserror`.

#![deny(unsafe_code)]

pub mod errors;
pub mod rate_limiter;
pub mod serial_executor;

pub use errors::ExecutorError;
pub use rate_limiter::{backoff_delay, RateLimiter};
pub use serial_executor::{InitError, SerialExecutor};
