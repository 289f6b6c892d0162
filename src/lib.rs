pub mod config;
pub mod coordinator;
pub mod error;
pub mod shared_counter;
pub mod sink;
pub mod task;

pub use config::CountingConfig;
pub use coordinator::{Coordinator, Phase, RunSummary, TaskOutcome};
pub use error::{CoordinatorError, CounterError, TaskError};
pub use shared_counter::{Handoff, SharedCounter};
pub use sink::{ConsoleSink, Direction, Event, Recorder, Sink};

/// Error returned by the binary's `main`.
///
/// Library operations use the typed errors in [`error`]; the binary only
/// needs to print whatever went wrong and exit non-zero.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for the binary.
pub type Result<T> = std::result::Result<T, Error>;

pub const BANNER: &str = r"
                   **************************************
                   *   Thread Counting Synchronization  *
                   **************************************
";
