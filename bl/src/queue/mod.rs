//! Load queue
//!
//! Orders dispatch of queue items, honours precedence directives and joins
//! item settlements into one completion.

mod config;
mod core;
mod report;

pub use config::{FailMode, QueueConfig};
pub use core::{JointCompletion, Queue};
pub use report::{ItemOutcome, QueueReport};
