//! The two counting tasks.
//!
//! Each entry function returns a `Result` instead of unwinding; the
//! coordinator stores it as that task's outcome. Every lock is taken inside
//! a `SharedCounter` call and released before the call returns, so a failing
//! step never leaves the mutex held and no pacing sleep happens under it.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::TaskError;
use crate::shared_counter::SharedCounter;
use crate::sink::{Direction, Event, Sink};

/// Counts the shared value up to `bound`, then marks the phase done.
pub fn count_up(
    name: &str,
    counter: &SharedCounter,
    bound: i64,
    pace: Duration,
    sink: &dyn Sink,
) -> Result<usize, TaskError> {
    sink.emit(Event::Live {
        task: name.to_string(),
    })?;

    thread::sleep(pace);
    let mut value = counter.snapshot()?.value;
    sink.emit(Event::PhaseStarted {
        task: name.to_string(),
        direction: Direction::Up,
    })?;
    sink.emit(counted(name, Direction::Up, value))?;
    let mut steps = 1;

    while value < bound {
        thread::sleep(pace);
        value = counter.locked_increment()?;
        sink.emit(counted(name, Direction::Up, value))?;
        steps += 1;
    }

    counter.mark_done()?;
    info!("{} reached {} and marked the up phase done", name, value);
    Ok(steps)
}

/// Waits for the up phase, then counts the shared value down to zero.
///
/// The start bound is whatever the up task left; it is only reachable
/// through the handoff returned by the wait.
pub fn count_down(
    name: &str,
    counter: &SharedCounter,
    pace: Duration,
    wait_timeout: Option<Duration>,
    sink: &dyn Sink,
) -> Result<usize, TaskError> {
    sink.emit(Event::Live {
        task: name.to_string(),
    })?;

    debug!("{} waiting for the up phase", name);
    let handoff = match wait_timeout {
        Some(timeout) => counter.wait_until_done_for(timeout)?,
        None => counter.wait_until_done()?,
    };
    info!("{} woke up, counting down from {}", name, handoff.start());

    sink.emit(Event::PhaseStarted {
        task: name.to_string(),
        direction: Direction::Down,
    })?;
    thread::sleep(pace);
    let mut value = handoff.start();
    sink.emit(counted(name, Direction::Down, value))?;
    let mut steps = 1;

    while value > 0 {
        thread::sleep(pace);
        value = handoff.decrement()?;
        sink.emit(counted(name, Direction::Down, value))?;
        steps += 1;
    }

    Ok(steps)
}

fn counted(name: &str, direction: Direction, value: i64) -> Event {
    Event::Counted {
        task: name.to_string(),
        direction,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Recorder;

    #[test]
    fn up_counts_inclusive_range_and_marks_done() {
        let counter = SharedCounter::default();
        let recorder = Recorder::new();
        let steps = count_up("up", &counter, 3, Duration::ZERO, &recorder).unwrap();
        assert_eq!(steps, 4);
        assert_eq!(recorder.counted(Direction::Up), vec![0, 1, 2, 3]);
        assert!(counter.is_done().unwrap());
    }

    #[test]
    fn up_from_above_bound_only_reports_start() {
        let counter = SharedCounter::new(5);
        let recorder = Recorder::new();
        let steps = count_up("up", &counter, 2, Duration::ZERO, &recorder).unwrap();
        assert_eq!(steps, 1);
        assert_eq!(recorder.counted(Direction::Up), vec![5]);
        assert_eq!(counter.snapshot().unwrap().value, 5);
    }

    #[test]
    fn down_starts_from_value_left_by_up() {
        let counter = SharedCounter::new(4);
        counter.mark_done().unwrap();
        let recorder = Recorder::new();
        let steps = count_down("down", &counter, Duration::ZERO, None, &recorder).unwrap();
        assert_eq!(steps, 5);
        assert_eq!(recorder.counted(Direction::Down), vec![4, 3, 2, 1, 0]);
        assert_eq!(counter.snapshot().unwrap().value, 0);
    }

    #[test]
    fn down_times_out_when_up_never_finishes() {
        let counter = SharedCounter::default();
        let recorder = Recorder::new();
        let result = count_down(
            "down",
            &counter,
            Duration::ZERO,
            Some(Duration::from_millis(10)),
            &recorder,
        );
        assert!(matches!(result, Err(TaskError::Counter(_))));
        assert!(recorder.counted(Direction::Down).is_empty());
    }
}
