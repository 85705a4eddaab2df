//! Sequential batch conversion.
//!
//! A batch runs one route over an ordered list of uploaded items, strictly
//! one item at a time. Every item yields at least one [`Outcome`]: a failure
//! is recorded and the batch moves on to the next item.

mod runner;
mod types;

pub use runner::BatchOrchestrator;
pub use types::{BatchControl, BatchJob, BatchProgress, BatchState, CancelHandle, Outcome};
