mod poller;

pub use poller::{Generation, PollOutcome, Poller};
