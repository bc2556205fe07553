//! This module takes care of scheduling the selection work, encapsulating use
//! of multiple threads

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{cutflow::Cutflow, event::EventStore};

use eyre::Result;

/// Size of the event batches
///
/// Events are grouped in batches of a certain size, each batch producing its
/// own partial report. Partial reports are always merged in batch order, so
/// that sequential and parallel runs produce bitwise identical weighted
/// counts.
///
pub const EVENT_BATCH_SIZE: usize = 1_000;

/// Accumulated outcome of the selection over some events
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Selection counters
    pub cutflow: Cutflow,

    /// Number of events which went through the selection
    pub events_processed: u64,

    /// Number of events which passed the selection
    pub events_kept: u64,
}
//
impl RunReport {
    /// Integrate the report of a later batch of events
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        self.cutflow.merge(other.cutflow);
        self.events_processed += other.events_processed;
        self.events_kept += other.events_kept;
    }
}

/// Run the selection in the manner that was configured at build time
///
/// Takes as parameters the events to be processed, and a selection kernel
/// which processes a batch of events given the position of the first event of
/// the batch. The first error aborts the run.
///
pub fn run_selection(
    events: &mut [EventStore],
    process_events: impl Send + Sync + Fn(usize, &mut [EventStore]) -> Result<RunReport>,
) -> Result<RunReport> {
    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::run_selection_impl(events, process_events)
    }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    {
        multi_threading::run_selection_impl(events, process_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Configuration,
        electron::{fixtures, Vertex},
        event::PRIMARY_VERTICES,
        numeric::Float,
        selector::ElectronSelector,
    };

    fn events(count: usize) -> Vec<EventStore> {
        (0..count)
            .map(|idx| {
                let mut store = EventStore::default();
                store.info.event_number = idx as u64;
                store.info.mc_event_weight = Some(0.1 * (idx % 7) as Float);
                store
                    .vertices
                    .insert(PRIMARY_VERTICES.to_owned(), vec![Vertex::primary(0.)]);
                let pt = 1e3 * (idx % 50) as Float;
                store
                    .electrons
                    .insert("Electrons".to_owned(), vec![fixtures::electron(pt, 0.3)]);
                store
            })
            .collect()
    }

    fn selector() -> ElectronSelector {
        let cfg =
            Configuration::parse("InputContainer: Electrons\npTMin: 20e3\nPassMin: 1").unwrap();
        ElectronSelector::new("ElectronSelector", cfg).unwrap()
    }

    #[test]
    fn batching_matches_single_pass() {
        let selector = selector();
        let num_events = 2 * EVENT_BATCH_SIZE + 123;

        let mut single_pass = events(num_events);
        let mut expected = RunReport::default();
        for batch in single_pass.chunks_mut(EVENT_BATCH_SIZE) {
            expected.merge(selector.process_events(0, batch).unwrap());
        }

        let mut batched = events(num_events);
        let report = run_selection(&mut batched, |first, batch| {
            selector.process_events(first, batch)
        })
        .unwrap();
        assert_eq!(report, expected);
        assert_eq!(report.events_processed, num_events as u64);
        assert_eq!(report.cutflow.events_seen(), num_events as u64);
        assert_eq!(report.events_kept, expected.cutflow.events_passed());
        assert!(batched
            .iter()
            .all(|store| store.electrons("Electrons").unwrap()[0].pass_sel.is_some()));
    }

    #[test]
    fn batch_positions() {
        let mut events = events(EVENT_BATCH_SIZE + 1);
        let report = run_selection(&mut events, |first, batch| {
            assert_eq!(first % EVENT_BATCH_SIZE, 0);
            assert!(batch.iter().all(|store| store.info.event_number >= first as u64));
            Ok(RunReport {
                events_processed: batch.len() as u64,
                ..RunReport::default()
            })
        })
        .unwrap();
        assert_eq!(report.events_processed, EVENT_BATCH_SIZE as u64 + 1);
    }

    #[test]
    fn no_events() {
        let report = run_selection(&mut [], |_, _| Ok(RunReport::default())).unwrap();
        assert_eq!(report, RunReport::default());
    }

    #[test]
    fn errors_are_propagated() {
        let selector = selector();
        let mut events = events(EVENT_BATCH_SIZE + 10);
        events[EVENT_BATCH_SIZE + 3].info.mc_event_weight = None;
        let err = run_selection(&mut events, |first, batch| {
            selector.process_events(first, batch)
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Failed to process event #{}", EVENT_BATCH_SIZE + 3)
        );
    }
}
