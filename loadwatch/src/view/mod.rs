mod autoscroll;
mod timeline;

pub use autoscroll::{Autoscroll, ScrollMode, STICK_THRESHOLD};
pub use timeline::{
    build_ticks, EntrancePulse, TimelineTick, Tone, PULSE_DURATION, TIMELINE_WINDOW,
};
