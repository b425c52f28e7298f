//! Operator selection: the (year, layer) state machine and the text
//! commands that drive it.

use std::fmt;
use tracing::debug;

use crate::layers::LayerKind;
use crate::years::YearRange;

pub mod session;
pub use session::{Session, Status};

/// What the map should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub year: i32,
    pub layer: String,
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.year, self.layer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Raw slider position; rounded and clamped to the year range.
    Slider(f64),
    /// Dropdown selection, not validated against the known layers.
    Dropdown(String),
    /// Auto-advance timer.
    Tick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(Event),
    Quit,
}

/// Parses one line of operator input: `year <n>`, `layer <name>`, `next`
/// or `quit`. Returns `None` for anything else.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word.to_ascii_lowercase().as_str(), rest) {
        ("year", value) => value
            .parse::<f64>()
            .ok()
            .map(|v| Command::Event(Event::Slider(v))),
        ("layer", name) if !name.is_empty() => {
            Some(Command::Event(Event::Dropdown(name.to_string())))
        }
        ("next", "") => Some(Command::Event(Event::Tick)),
        ("quit" | "exit", "") => Some(Command::Quit),
        _ => None,
    }
}

/// Owns the selection; every event yields the state to recompute.
#[derive(Debug, Clone)]
pub struct Controller {
    years: YearRange,
    state: SelectionState,
}

impl Controller {
    pub fn new(years: YearRange) -> Self {
        Self {
            years,
            state: SelectionState {
                year: years.min(),
                layer: LayerKind::PermanentWater.label().to_string(),
            },
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn handle(&mut self, event: Event) -> SelectionState {
        match event {
            Event::Slider(position) => self.slide(position),
            Event::Dropdown(layer) => {
                debug!(layer = %layer, "layer selected");
                self.state.layer = layer;
            }
            Event::Tick => {
                let next = self.years.next_wrapping(self.state.year);
                self.slide(f64::from(next));
            }
        }

        self.state.clone()
    }

    fn slide(&mut self, position: f64) {
        let year = if position.is_finite() {
            self.years.clamp(position.round() as i32)
        } else {
            self.state.year
        };
        debug!(year, "year selected");
        self.state.year = year;
    }
}
