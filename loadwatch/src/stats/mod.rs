mod history;
mod sources;
mod status;

pub use history::{SnapshotHistory, HISTORY_CAPACITY};
pub use sources::{summarize_sources, KnownSourceSet, SourceSummary};
pub use status::{status_distribution, TRACKED_STATUS_CODES};
