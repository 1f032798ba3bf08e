//! Derivative cache for Darkroom.
//!
//! Serves image derivatives for (style, source) pairs: immediately from
//! a fast local path, while the durable copy reaches the remote store
//! exactly once per generation through a deferred, lock-guarded copy
//! queue.

pub mod copier;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod style;
pub mod tags;

pub use copier::{CopyTask, DerivativeCopier};
pub use error::{DerivativeError, DerivativeResult};
pub use generator::{DerivativeGenerator, PassthroughGenerator};
pub use pipeline::{DeliverOutcome, DerivativePipeline};
pub use style::DerivativeStyle;
pub use tags::{CacheTagInvalidator, LoggingInvalidator, file_cache_tag};
