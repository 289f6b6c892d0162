use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Something a counting task reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Live { task: String },
    PhaseStarted { task: String, direction: Direction },
    Counted { task: String, direction: Direction, value: i64 },
}

impl Event {
    /// The counted value, for `Counted` events in the given direction.
    pub fn counted(&self, which: Direction) -> Option<i64> {
        match self {
            Event::Counted {
                direction, value, ..
            } if *direction == which => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Live { task } => write!(f, "--- {} is live ---", task),
            Event::PhaseStarted {
                task,
                direction: Direction::Up,
            } => write!(f, "--- Counting Up {} ---", task),
            Event::PhaseStarted {
                task,
                direction: Direction::Down,
            } => write!(f, "--- Counting down {} ---", task),
            Event::Counted {
                task,
                direction: Direction::Up,
                value,
            } => write!(f, "{} counting up: {}", task, value),
            Event::Counted {
                task,
                direction: Direction::Down,
                value,
            } => write!(f, "{} counting down: {}", task, value),
        }
    }
}

/// Where counting tasks send their events. Shared by both task threads.
pub trait Sink: Sync {
    fn emit(&self, event: Event) -> io::Result<()>;
}

/// Prints one line per event on stdout.
#[derive(Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn emit(&self, event: Event) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if !matches!(event, Event::Counted { .. }) {
            writeln!(out)?;
        }
        writeln!(out, "{}", event)?;
        out.flush()
    }
}

/// Keeps every event in emission order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(|e| e.to_string()).collect()
    }

    pub fn counted(&self, direction: Direction) -> Vec<i64> {
        self.events()
            .iter()
            .filter_map(|e| e.counted(direction))
            .collect()
    }
}

impl Sink for Recorder {
    fn emit(&self, event: Event) -> io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
