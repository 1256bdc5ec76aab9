//! Retry and request lifecycle handling
//!
//! Every request a transport sends goes through a [`RetryPolicy`], which
//! runs the request up to `max_attempts` times and calls a set of lifecycle
//! hooks around each attempt:
//!
//! - `before_request` before every attempt
//! - `request_done` when an attempt succeeds (its return value is the result)
//! - `request_error` when an attempt fails (its return value is the attempt's outcome)
//! - `request_final` after every attempt, whatever the outcome
//!
//! The budget is an attempt count, not a duration. Retries are immediate.

mod hooks;
mod policy;

pub use hooks::{AsyncRequestHooks, CallbackHooks, DefaultHooks, LoggingHooks, RequestHooks};
pub use policy::{RetryPolicy, DEFAULT_RETRY_BUDGET};
