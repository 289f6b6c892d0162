use std::fmt;
use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::config::CountingConfig;
use crate::error::{CoordinatorError, TaskError};
use crate::shared_counter::SharedCounter;
use crate::sink::{Direction, Sink};
use crate::task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Joined,
    Terminal,
}

/// How one task ended. Task failures stop here and never reach the exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { steps: usize },
    Failed(String),
}

impl TaskOutcome {
    fn contain(name: &str, result: Result<usize, TaskError>) -> TaskOutcome {
        match result {
            Ok(steps) => TaskOutcome::Completed { steps },
            Err(e) => {
                error!("{} encountered an error: {}", name, e);
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Completed { steps } => write!(f, "completed after {} steps", steps),
            TaskOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub up_name: String,
    pub down_name: String,
    pub up: TaskOutcome,
    pub down: TaskOutcome,
    /// Counter state read once after both tasks were joined.
    pub final_value: i64,
    pub done: bool,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn all_completed(&self) -> bool {
        self.up.is_completed() && self.down.is_completed()
    }
}

/// Owns one run: builds the counter, runs both tasks on their own threads
/// and joins them before the counter goes away.
pub struct Coordinator {
    config: CountingConfig,
    phase: Phase,
    #[cfg(test)]
    refuse_spawn: Option<Direction>,
}

impl Coordinator {
    pub fn new(config: CountingConfig) -> Coordinator {
        Coordinator {
            config,
            phase: Phase::Idle,
            #[cfg(test)]
            refuse_spawn: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs both tasks to completion. Only spawn and join failures are errors;
    /// a coordinator runs at most once.
    pub fn run(&mut self, sink: &dyn Sink) -> Result<RunSummary, CoordinatorError> {
        if self.phase != Phase::Idle {
            return Err(CoordinatorError::AlreadyRan);
        }
        let started_at = Local::now();
        let clock = Instant::now();
        let counter = SharedCounter::new(self.config.start);

        let joined = thread::scope(|s| self.run_in_scope(s, &counter, sink));
        self.phase = Phase::Terminal;
        let (up, down) = joined?;

        let snapshot = counter.snapshot()?;
        let summary = RunSummary {
            up_name: self.config.up_name.clone(),
            down_name: self.config.down_name.clone(),
            up,
            down,
            final_value: snapshot.value,
            done: snapshot.done,
            started_at,
            elapsed: clock.elapsed(),
        };
        info!(
            "run finished in {:?}: {} {}, {} {}, final value {}",
            summary.elapsed,
            summary.up_name,
            summary.up,
            summary.down_name,
            summary.down,
            summary.final_value
        );
        Ok(summary)
    }

    fn run_in_scope<'scope, 'env>(
        &mut self,
        s: &'scope Scope<'scope, 'env>,
        counter: &'env SharedCounter,
        sink: &'env dyn Sink,
    ) -> Result<(TaskOutcome, TaskOutcome), CoordinatorError> {
        let config = &self.config;
        let (up_name, down_name) = (config.up_name.clone(), config.down_name.clone());
        let (bound, pace, wait_timeout) = (config.bound, config.pace, config.wait_timeout);

        // Up goes first: if the down spawn then fails, up still finishes on its own.
        let up = self
            .spawn(s, Direction::Up, &up_name, {
                let name = up_name.clone();
                move || {
                    TaskOutcome::contain(&name, task::count_up(&name, counter, bound, pace, sink))
                }
            })
            .map_err(|source| CoordinatorError::Spawn {
                task: up_name.clone(),
                source,
            })?;

        let down = match self.spawn(s, Direction::Down, &down_name, {
            let name = down_name.clone();
            move || {
                TaskOutcome::contain(
                    &name,
                    task::count_down(&name, counter, pace, wait_timeout, sink),
                )
            }
        }) {
            Ok(handle) => handle,
            Err(source) => {
                error!("failed to spawn {}, joining {} before giving up", down_name, up_name);
                if up.join().is_err() {
                    error!("{} panicked while {} failed to spawn", up_name, down_name);
                }
                return Err(CoordinatorError::Spawn {
                    task: down_name,
                    source,
                });
            }
        };

        self.phase = Phase::Running;
        debug!("{} and {} running", up_name, down_name);

        let up = up.join();
        let down = down.join();
        self.phase = Phase::Joined;

        let up = up.map_err(|_| CoordinatorError::Join { task: up_name })?;
        let down = down.map_err(|_| CoordinatorError::Join { task: down_name })?;
        Ok((up, down))
    }

    fn spawn<'scope, 'env, F>(
        &self,
        s: &'scope Scope<'scope, 'env>,
        which: Direction,
        name: &str,
        f: F,
    ) -> io::Result<ScopedJoinHandle<'scope, TaskOutcome>>
    where
        F: FnOnce() -> TaskOutcome + Send + 'scope,
    {
        #[cfg(test)]
        {
            if self.refuse_spawn == Some(which) {
                return Err(io::Error::new(io::ErrorKind::Other, "spawn refused"));
            }
        }
        #[cfg(not(test))]
        let _ = which;

        thread::Builder::new()
            .name(name.to_string())
            .spawn_scoped(s, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Recorder;

    fn quick() -> CountingConfig {
        CountingConfig::default()
            .with_bound(3)
            .with_pace(Duration::ZERO)
    }

    #[test]
    fn run_moves_through_phases_once() {
        let mut coordinator = Coordinator::new(quick());
        assert_eq!(coordinator.phase(), Phase::Idle);
        let summary = coordinator.run(&Recorder::new()).unwrap();
        assert_eq!(coordinator.phase(), Phase::Terminal);
        assert!(summary.all_completed());
        assert_eq!(summary.final_value, 0);
        assert!(summary.done);

        let again = coordinator.run(&Recorder::new());
        assert!(matches!(again, Err(CoordinatorError::AlreadyRan)));
        assert_eq!(coordinator.phase(), Phase::Terminal);
    }

    #[test]
    fn down_spawn_failure_still_joins_up() {
        let recorder = Recorder::new();
        let mut coordinator = Coordinator::new(quick());
        coordinator.refuse_spawn = Some(Direction::Down);

        let result = coordinator.run(&recorder);
        match result {
            Err(CoordinatorError::Spawn { task, .. }) => assert_eq!(task, "Thread 2"),
            other => panic!("unexpected result: {:?}", other.map(|s| s.final_value)),
        }
        assert_eq!(coordinator.phase(), Phase::Terminal);
        // The up task was joined, so its output is complete.
        assert_eq!(recorder.counted(Direction::Up), vec![0, 1, 2, 3]);
        assert!(recorder.counted(Direction::Down).is_empty());
    }

    struct PanicOnUp;

    impl Sink for PanicOnUp {
        fn emit(&self, event: crate::sink::Event) -> io::Result<()> {
            if event.counted(Direction::Up).is_some() {
                panic!("up output exploded");
            }
            Ok(())
        }
    }

    #[test]
    fn panicked_up_is_joined_when_down_spawn_fails() {
        let mut coordinator = Coordinator::new(quick());
        coordinator.refuse_spawn = Some(Direction::Down);

        // The spawn failure is reported; the up panic is joined, not rethrown.
        let result = coordinator.run(&PanicOnUp);
        match result {
            Err(CoordinatorError::Spawn { task, .. }) => assert_eq!(task, "Thread 2"),
            other => panic!("unexpected result: {:?}", other.map(|s| s.final_value)),
        }
        assert_eq!(coordinator.phase(), Phase::Terminal);
    }

    #[test]
    fn up_spawn_failure_starts_nothing() {
        let recorder = Recorder::new();
        let mut coordinator = Coordinator::new(quick());
        coordinator.refuse_spawn = Some(Direction::Up);

        let result = coordinator.run(&recorder);
        assert!(matches!(result, Err(CoordinatorError::Spawn { .. })));
        assert!(recorder.events().is_empty());
    }
}
