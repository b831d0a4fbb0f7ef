use crate::api::RequestEvent;

/// Status codes tracked by the distribution view, in display order. The
/// set is fixed; codes outside it are invisible to this view.
pub const TRACKED_STATUS_CODES: [u16; 4] = [200, 429, 500, 503];

/// Tallies events carrying exactly one of the tracked codes. Absent codes
/// yield a zero count; order never changes.
pub fn status_distribution(events: &[RequestEvent]) -> [(u16, u64); 4] {
    let mut counts = TRACKED_STATUS_CODES.map(|code| (code, 0u64));
    for event in events {
        let Some(status) = event.status else { continue };
        if let Some(slot) = counts.iter_mut().find(|(code, _)| *code == status) {
            slot.1 += 1;
        }
    }
    counts
}
