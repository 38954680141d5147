//! # Strata Queue
//!
//! `strata-queue` serializes migrations per form while letting independent forms
//! migrate in parallel. Jobs live in a durable table (claims survive crashes); an
//! in-process worker pool drains them, retrying transient database failures with
//! exponential backoff and reverting jobs stranded by a crashed worker after a
//! visibility timeout.
//!
//! Ordering guarantees: jobs on the same form run FIFO by enqueue time; there is no
//! cross-form ordering.

#![warn(missing_docs)]

pub mod backoff;
pub mod error;
pub mod queue;
pub mod worker;

pub use error::QueueError;
pub use queue::{MigrationQueue, QueueSettings};
