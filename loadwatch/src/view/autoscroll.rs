//! Viewport policy for the timeline strip.
//!
//! Two states: `StickToEnd` follows the newest sample on every update;
//! `Manual` holds still so the operator can inspect a point of interest.
//! Scrolling further than [`STICK_THRESHOLD`] units from the end flips to
//! `Manual`; coming back within it flips back.

/// Distance from the end (in timeline units) within which the viewport
/// snaps back to following the newest sample.
pub const STICK_THRESHOLD: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    StickToEnd,
    Manual,
}

#[derive(Debug)]
pub struct Autoscroll {
    mode: ScrollMode,
    offset_from_end: u32,
}

impl Autoscroll {
    pub fn new() -> Autoscroll {
        Autoscroll {
            mode: ScrollMode::StickToEnd,
            offset_from_end: 0,
        }
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    /// Current viewport offset, in units back from the newest sample.
    pub fn offset_from_end(&self) -> u32 {
        self.offset_from_end
    }

    /// True when newer data is off-screen and a hint should be shown.
    pub fn newer_data_offscreen(&self) -> bool {
        self.mode == ScrollMode::Manual && self.offset_from_end > 0
    }

    /// The operator scrolled to `offset_from_end` units before the end.
    pub fn scrolled_to(&mut self, offset_from_end: u32) {
        self.offset_from_end = offset_from_end;
        self.mode = if offset_from_end > STICK_THRESHOLD {
            ScrollMode::Manual
        } else {
            ScrollMode::StickToEnd
        };
    }

    /// New data arrived. Only `StickToEnd` moves the viewport.
    pub fn on_update(&mut self) {
        if self.mode == ScrollMode::StickToEnd {
            self.offset_from_end = 0;
        }
    }

    /// Jump straight back to following the newest sample.
    pub fn stick(&mut self) {
        self.mode = ScrollMode::StickToEnd;
        self.offset_from_end = 0;
    }
}

impl Default for Autoscroll {
    fn default() -> Autoscroll {
        Autoscroll::new()
    }
}
