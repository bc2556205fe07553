//! Sequential back-end of the selection

use crate::{
    event::EventStore,
    scheduling::{RunReport, EVENT_BATCH_SIZE},
};

use eyre::Result;

/// Process events in sequential mode
///
/// We use batched logic even in sequential mode, in order to achieve
/// reproducibility with respect to multi-threaded runs.
///
pub fn run_selection_impl(
    events: &mut [EventStore],
    process_events: impl Fn(usize, &mut [EventStore]) -> Result<RunReport>,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    for (batch_idx, batch) in events.chunks_mut(EVENT_BATCH_SIZE).enumerate() {
        report.merge(process_events(batch_idx * EVENT_BATCH_SIZE, batch)?);
    }
    Ok(report)
}
