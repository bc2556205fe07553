//! Multi-threaded back-end of the selection

use crate::{
    event::EventStore,
    scheduling::{RunReport, EVENT_BATCH_SIZE},
};

use eyre::Result;
use rayon::prelude::*;

/// Process events in multi-threaded mode
///
/// Each batch of events is processed by its own task. The partial reports are
/// collected in batch order before being merged, so that the final counts do
/// not depend on how tasks were scheduled.
///
pub fn run_selection_impl(
    events: &mut [EventStore],
    process_events: impl Send + Sync + Fn(usize, &mut [EventStore]) -> Result<RunReport>,
) -> Result<RunReport> {
    let batch_reports = events
        .par_chunks_mut(EVENT_BATCH_SIZE)
        .enumerate()
        .map(|(batch_idx, batch)| process_events(batch_idx * EVENT_BATCH_SIZE, batch))
        .collect::<Result<Vec<_>>>()?;

    // NOTE: Merging is done sequentially, in batch order, for reproducibility
    Ok(batch_reports
        .into_iter()
        .fold(RunReport::default(), |mut acc, report| {
            acc.merge(report);
            acc
        }))
}
