use std::io;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;

/// Failures of a `SharedCounter` operation.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Another task panicked while it held the counter lock.
    #[error("counter lock poisoned by a panicked task")]
    Poisoned,

    /// A bounded `wait_until_done_for` gave up before completion was marked.
    #[error("no completion signal within {0:?}")]
    TimedOut(Duration),
}

impl<T> From<PoisonError<T>> for CounterError {
    fn from(_: PoisonError<T>) -> Self {
        CounterError::Poisoned
    }
}

/// Failures that end a counting task early. They stay inside the task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error("output failed: {0}")]
    Output(#[from] io::Error),
}

/// Failures of the coordinator itself; these decide the exit status.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to spawn {task}: {source}")]
    Spawn {
        task: String,
        #[source]
        source: io::Error,
    },

    #[error("{task} panicked and could not be joined")]
    Join { task: String },

    #[error("cannot read the counter after join: {0}")]
    Counter(#[from] CounterError),

    #[error("coordinator already ran")]
    AlreadyRan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn poison_maps_to_poisoned() {
        let lock = Mutex::new(0);
        let _ = std::panic::catch_unwind(|| {
            let _guard = lock.lock().unwrap();
            panic!("poison");
        });
        let err: CounterError = lock.lock().unwrap_err().into();
        assert!(matches!(err, CounterError::Poisoned));
    }

    #[test]
    fn task_error_is_transparent_over_counter_error() {
        let err = TaskError::from(CounterError::TimedOut(Duration::from_millis(5)));
        assert_eq!(err.to_string(), "no completion signal within 5ms");
    }

    #[test]
    fn spawn_error_names_the_task() {
        let err = CoordinatorError::Spawn {
            task: "Thread 2".to_string(),
            source: io::Error::new(io::ErrorKind::Other, "out of threads"),
        };
        assert_eq!(err.to_string(), "failed to spawn Thread 2: out of threads");
    }
}
