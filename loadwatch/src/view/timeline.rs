//! Timeline model: turns the snapshot history into renderable ticks and
//! arms a short entrance pulse when a genuinely new sample lands.

use std::time::{Duration, Instant};

use crate::api::{time, CircuitState, Snapshot};

/// How many of the newest history samples the timeline considers.
pub const TIMELINE_WINDOW: usize = 260;

/// How long a newly arrived sample pulses.
pub const PULSE_DURATION: Duration = Duration::from_millis(220);

/// Severity tone of one timeline sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Warn,
    Danger,
    Unknown,
}

impl Tone {
    pub fn of(state: CircuitState) -> Tone {
        match state {
            CircuitState::Closed => Tone::Ok,
            CircuitState::HalfOpen => Tone::Warn,
            CircuitState::Open => Tone::Danger,
            CircuitState::Unknown => Tone::Unknown,
        }
    }
}

/// One renderable sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineTick {
    pub tone: Tone,
    /// `HH:MM:SS` display label derived from the sample timestamp.
    pub label: String,
}

/// Builds oldest→newest ticks from a newest-first history iterator.
///
/// Only the newest [`TIMELINE_WINDOW`] samples are considered, and samples
/// whose timestamp yields no display label are dropped outright rather
/// than rendered as gaps.
pub fn build_ticks<'a, I>(newest_first: I) -> Vec<TimelineTick>
where
    I: Iterator<Item = &'a Snapshot>,
{
    let mut ticks: Vec<TimelineTick> = newest_first
        .take(TIMELINE_WINDOW)
        .filter_map(|snapshot| {
            let label = time::time_label(&snapshot.timestamp)?;
            Some(TimelineTick {
                tone: Tone::of(snapshot.circuit_breaker_state),
                label,
            })
        })
        .collect();
    ticks.reverse();
    ticks
}

/// Arms one bounded entrance transition per genuinely new newest sample.
/// Re-rendering with the same newest timestamp never re-arms it.
#[derive(Debug, Default)]
pub struct EntrancePulse {
    last_newest: Option<String>,
    armed_until: Option<Instant>,
}

impl EntrancePulse {
    pub fn new() -> EntrancePulse {
        EntrancePulse::default()
    }

    /// Observes the newest raw timestamp at render time.
    pub fn observe(&mut self, newest: Option<&str>, now: Instant) {
        let Some(newest) = newest else { return };
        if self.last_newest.as_deref() != Some(newest) {
            self.last_newest = Some(newest.to_string());
            self.armed_until = Some(now + PULSE_DURATION);
        }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.armed_until.is_some_and(|deadline| now < deadline)
    }
}
