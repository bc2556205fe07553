//! This module keeps track of how many objects and events survive the
//! selection, and reports it in the job's cutflow histograms

use crate::numeric::Float;

/// Running selection counters of one worker
///
/// Counters are only ever incremented from a single collection per event
/// (the nominal one), so that systematic variants are not double-counted.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cutflow {
    /// Number of events which were counted
    events_seen: u64,

    /// Number of objects which were evaluated
    objects_seen: u64,

    /// Number of objects which passed the cuts
    objects_passed: u64,

    /// Number of events which passed the selection
    events_passed: u64,

    /// Sum of the weights of the events which passed the selection
    weighted_events_passed: Float,
}
//
impl Cutflow {
    /// Start counting from zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for the selection outcome of one event
    pub fn record(
        &mut self,
        objects_seen: usize,
        objects_passed: usize,
        event_passed: bool,
        weight: Float,
    ) {
        self.events_seen += 1;
        self.objects_seen += objects_seen as u64;
        self.objects_passed += objects_passed as u64;
        if event_passed {
            self.events_passed += 1;
            self.weighted_events_passed += weight;
        }
    }

    /// Integrate the counts of another worker
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        self.events_seen += other.events_seen;
        self.objects_seen += other.objects_seen;
        self.objects_passed += other.objects_passed;
        self.events_passed += other.events_passed;
        self.weighted_events_passed += other.weighted_events_passed;
    }

    /// Number of events which were counted
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    /// Number of objects which were evaluated
    pub fn objects_seen(&self) -> u64 {
        self.objects_seen
    }

    /// Number of objects which passed the cuts
    pub fn objects_passed(&self) -> u64 {
        self.objects_passed
    }

    /// Number of events which passed the selection
    pub fn events_passed(&self) -> u64 {
        self.events_passed
    }

    /// Sum of the weights of the events which passed the selection
    pub fn weighted_events_passed(&self) -> Float {
        self.weighted_events_passed
    }

    /// Write the passed event counts into the bin of this selection stage,
    /// and return them as (raw, weighted)
    pub fn flush(self, stage_name: &str, histograms: &mut CutflowHistograms) -> (f64, f64) {
        let raw = self.events_passed as f64;
        let weighted = f64::from(self.weighted_events_passed);
        histograms.set(stage_name, raw, weighted);
        (raw, weighted)
    }
}

/// Histogram whose bins are identified by text labels
///
/// Bin contents are always double precision, whatever the precision of the
/// selection itself, so that large event counts remain exact.
///
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledHistogram {
    /// Histogram name
    name: String,

    /// Bin labels, in order of creation
    labels: Vec<String>,

    /// Bin contents
    contents: Vec<f64>,
}
//
impl LabelledHistogram {
    /// Create a histogram without any bin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            contents: Vec::new(),
        }
    }

    /// Histogram name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the bin with a given label, appending an empty one if needed
    pub fn find_bin(&mut self, label: &str) -> usize {
        if let Some(bin) = self.labels.iter().position(|l| l == label) {
            return bin;
        }
        self.labels.push(label.to_owned());
        self.contents.push(0.);
        self.labels.len() - 1
    }

    /// Overwrite the content of a bin
    pub fn set_bin_content(&mut self, bin: usize, value: f64) {
        self.contents[bin] = value;
    }

    /// Content of the bin with a given label, if it exists
    pub fn content(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|bin| self.contents[bin])
    }

    /// Iterate over (label, content) pairs in bin order
    pub fn bins(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.contents.iter().copied())
    }
}

/// Raw and weighted cutflow histograms of a job
#[derive(Clone, Debug, PartialEq)]
pub struct CutflowHistograms {
    /// Event counts
    pub raw: LabelledHistogram,

    /// Sums of event weights
    pub weighted: LabelledHistogram,
}
//
impl CutflowHistograms {
    /// Set up empty cutflow histograms
    pub fn new() -> Self {
        Self {
            raw: LabelledHistogram::new("cutflow"),
            weighted: LabelledHistogram::new("cutflow_weighted"),
        }
    }

    /// Set the raw and weighted content of the bins with a given label
    pub fn set(&mut self, label: &str, raw: f64, weighted: f64) {
        let bin = self.raw.find_bin(label);
        self.raw.set_bin_content(bin, raw);
        let bin = self.weighted.find_bin(label);
        self.weighted.set_bin_content(bin, weighted);
    }
}
//
impl Default for CutflowHistograms {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_once_per_call() {
        let mut cutflow = Cutflow::new();
        cutflow.record(4, 2, true, 0.5);
        cutflow.record(3, 0, false, 2.);
        cutflow.record(1, 1, true, 1.5);
        assert_eq!(cutflow.events_seen(), 3);
        assert_eq!(cutflow.objects_seen(), 8);
        assert_eq!(cutflow.objects_passed(), 3);
        assert_eq!(cutflow.events_passed(), 2);
        assert_eq!(cutflow.weighted_events_passed(), 2.);
    }

    #[test]
    fn merge_adds_up() {
        let mut first = Cutflow::new();
        first.record(2, 1, true, 1.);
        let mut second = Cutflow::new();
        second.record(5, 5, true, 3.);
        second.record(1, 0, false, 3.);

        let mut sequential = Cutflow::new();
        sequential.record(2, 1, true, 1.);
        sequential.record(5, 5, true, 3.);
        sequential.record(1, 0, false, 3.);

        first.merge(second);
        assert_eq!(first, sequential);
    }

    #[test]
    fn flush_fills_stage_bin() {
        let mut histograms = CutflowHistograms::new();
        histograms.set("all", 10., 12.5);

        let mut cutflow = Cutflow::new();
        cutflow.record(2, 2, true, 1.25);
        cutflow.record(2, 1, true, 0.75);
        cutflow.record(2, 0, false, 1.);
        assert_eq!(cutflow.flush("ElectronSelector", &mut histograms), (2., 2.));

        assert_eq!(histograms.raw.content("all"), Some(10.));
        assert_eq!(histograms.raw.content("ElectronSelector"), Some(2.));
        assert_eq!(histograms.weighted.content("ElectronSelector"), Some(2.));
        let labels: Vec<_> = histograms.raw.bins().map(|(label, _)| label).collect();
        assert_eq!(labels, ["all", "ElectronSelector"]);
    }

    #[test]
    fn raw_counts_stay_exact() {
        // Not representable in single precision
        let events = (1u64 << 24) + 1;
        let mut cutflow = Cutflow::new();
        for _ in 0..3 {
            cutflow.record(1, 1, true, 1.);
        }
        let mut bulk = Cutflow::new();
        bulk.events_passed = events - 3;
        cutflow.merge(bulk);

        let mut histograms = CutflowHistograms::new();
        let (raw, _) = cutflow.flush("ElectronSelector", &mut histograms);
        assert_eq!(raw as u64, events);
        assert_eq!(histograms.raw.content("ElectronSelector"), Some(16_777_217.));
    }

    #[test]
    fn find_bin_is_stable() {
        let mut hist = LabelledHistogram::new("cutflow");
        assert_eq!(hist.find_bin("all"), 0);
        assert_eq!(hist.find_bin("sel"), 1);
        assert_eq!(hist.find_bin("all"), 0);
        hist.set_bin_content(1, 7.);
        assert_eq!(hist.content("sel"), Some(7.));
        assert_eq!(hist.content("missing"), None);
        assert_eq!(hist.name(), "cutflow");
    }
}
