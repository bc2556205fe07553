//! Electron selection stage: applies the electron cuts to every candidate of
//! an event, decides whether the event passes, and repeats this for each
//! systematic variant of the input collection

use crate::{
    config::Configuration,
    cutflow::Cutflow,
    electron::{Electron, PassSel, Vertex},
    error::missing_input,
    event::{ElectronView, EventStore, PRIMARY_VERTICES},
    numeric::Float,
    scheduling::RunReport,
    tools::SelectionTools,
};

use eyre::{Result, WrapErr};
use tracing::{debug, warn};

/// Outcome of the selection on one electron collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Truth that the event passes the multiplicity requirements
    pub pass: bool,

    /// Number of candidates which were evaluated
    pub objects_seen: usize,

    /// Number of candidates which passed the cuts
    pub objects_passed: usize,

    /// Positions of the passing candidates (if a view was requested)
    pub selected: Option<Vec<usize>>,
}

/// Configured electron selection stage
pub struct ElectronSelector {
    /// Name of this stage, used for tool names and the cutflow bin
    name: String,

    /// Selection configuration
    cfg: Configuration,

    /// Identification and isolation tools
    tools: SelectionTools,
}
//
impl ElectronSelector {
    // ### CONSTRUCTION ###

    /// Set up a selection stage with the standard decision tools
    pub fn new(name: impl Into<String>, cfg: Configuration) -> Result<Self> {
        let name = name.into();
        let tools = SelectionTools::from_config(&name, &cfg)
            .wrap_err_with(|| format!("{name}: failed to initialize the selection tools"))?;
        Ok(Self::with_tools(name, cfg, tools))
    }

    /// Set up a selection stage with externally provided decision tools
    pub fn with_tools(name: impl Into<String>, cfg: Configuration, tools: SelectionTools) -> Self {
        Self {
            name: name.into(),
            cfg,
            tools,
        }
    }

    /// Name of this stage
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration of this stage
    pub fn config(&self) -> &Configuration {
        &self.cfg
    }

    // ### EVENT PROCESSING ###

    /// Run the selection on a batch of events
    ///
    /// `first_event` is the position of the first event of the batch in the
    /// full sample, which is used for error reporting.
    ///
    pub fn process_events(&self, first_event: usize, events: &mut [EventStore]) -> Result<RunReport> {
        let mut report = RunReport::default();
        for (offset, store) in events.iter_mut().enumerate() {
            let keep = self
                .execute(store, &mut report.cutflow)
                .wrap_err_with(|| format!("Failed to process event #{}", first_event + offset))?;
            report.events_processed += 1;
            if keep {
                report.events_kept += 1;
            }
        }
        Ok(report)
    }

    /// Run the selection on one event, returning whether it should be kept
    ///
    /// The cutflow is only fed by the first collection that is processed,
    /// which is the nominal one. Missing inputs abort the event before any
    /// counter or candidate is touched.
    ///
    pub fn execute(&self, store: &mut EventStore, cutflow: &mut Cutflow) -> Result<bool> {
        let context = || format!("{}::execute()", self.name);
        if self.cfg.debug {
            debug!(stage = %self.name, "Applying electron selection");
        }

        // Fetch the inputs shared by all collections
        let weight = store.info.mc_event_weight().wrap_err_with(context)?;
        store.vertices(PRIMARY_VERTICES).wrap_err_with(context)?;

        // Without an upstream list of variants, there is only one collection.
        // Otherwise, the first variant of the list is the nominal one.
        let multi_variant = !self.cfg.input_algo.is_empty();
        let variants = if multi_variant {
            let variants = store
                .name_list(&self.cfg.input_algo)
                .wrap_err_with(context)?
                .to_vec();
            if self.cfg.debug {
                debug!(count = variants.len(), "Input list of systematics");
            }
            if variants.is_empty() {
                warn!(list = %self.cfg.input_algo, "Empty list of systematics, nothing to select");
            }
            variants
        } else {
            vec![String::new()]
        };

        // Make sure that all collections are here before selecting anything.
        // The primary vertex is only needed if there is a candidate to select.
        let input_container = &self.cfg.input_container;
        let output_container = &self.cfg.output_container;
        let mut needs_vertex = false;
        for variant in &variants {
            let electrons = store
                .electrons(&format!("{input_container}{variant}"))
                .wrap_err_with(context)?;
            needs_vertex |= !electrons.is_empty();
        }
        let primary_vertex = if needs_vertex {
            Some(store.primary_vertex().wrap_err_with(context)?)
        } else {
            None
        };

        // Select each collection, counting only the first one
        let mut counting = Some(cutflow);
        let mut passing_variants = Vec::new();
        let mut event_pass = false;
        for variant in variants {
            let input_name = format!("{input_container}{variant}");
            let output_name = format!("{output_container}{variant}");
            let electrons = store.electrons_mut(&input_name).wrap_err_with(context)?;
            let outcome = self
                .execute_selection(electrons, primary_vertex.as_ref(), weight, counting.take())
                .wrap_err_with(context)?;
            if self.cfg.debug && multi_variant {
                debug!(
                    syst = %variant,
                    input = %input_name,
                    output = %output_name,
                    pass = outcome.pass,
                    "Selected systematic variant"
                );
            }

            // The event is kept if any variant passes
            event_pass |= outcome.pass;
            self.publish_view(store, &input_name, &output_name, outcome.pass, outcome.selected);
            if outcome.pass {
                passing_variants.push(variant);
            }
        }

        // Tell downstream stages which variants are worth looking at
        if multi_variant {
            if self.cfg.debug {
                debug!(count = passing_variants.len(), "Output list of systematics");
            }
            store.record_name_list(self.cfg.output_algo.clone(), passing_variants);
        }
        Ok(event_pass)
    }

    /// Select the candidates of one collection and apply the multiplicity
    /// requirements of the event
    ///
    /// Candidates are decorated in place if configured to. When a cutflow is
    /// provided, the outcome is accounted for in it. A primary vertex is
    /// required as soon as the collection is not empty, otherwise nothing is
    /// touched and an error is returned.
    ///
    pub fn execute_selection(
        &self,
        electrons: &mut [Electron],
        primary_vertex: Option<&Vertex>,
        weight: Float,
        cutflow: Option<&mut Cutflow>,
    ) -> Result<SelectionOutcome> {
        if primary_vertex.is_none() && !electrons.is_empty() {
            return Err(missing_input!(
                "no primary vertex in {} to select {} electrons",
                PRIMARY_VERTICES,
                electrons.len()
            ));
        }

        let cfg = &self.cfg;
        let cap = positive(cfg.n_to_process);
        let mut selected = cfg.create_selected_container.then(Vec::new);
        let mut objects_seen = 0;
        let mut objects_passed = 0;

        for (idx, electron) in electrons.iter_mut().enumerate() {
            // If only looking at a subset of candidates, make sure that the
            // others are flagged as such when decorating
            if cap.map_or(false, |cap| objects_seen >= cap) {
                if cfg.decorate_selected_objects {
                    electron.pass_sel = Some(PassSel::NotEvaluated);
                    continue;
                }
                break;
            }

            objects_seen += 1;
            let pass = primary_vertex
                .map_or(false, |pv| cfg.electron_cut.keep(electron, pv, &self.tools));
            if cfg.decorate_selected_objects {
                self.decorate(electron, pass);
            }
            if pass {
                objects_passed += 1;
                if let Some(selected) = &mut selected {
                    selected.push(idx);
                }
            }
        }
        if cfg.debug {
            debug!("Initial electrons: {objects_seen} - Selected electrons: {objects_passed}");
        }

        // Apply the requirements on the number of passing candidates
        let too_few = positive(cfg.pass_min).map_or(false, |min| objects_passed < min);
        let too_many = positive(cfg.pass_max).map_or(false, |max| objects_passed > max);
        let pass = !too_few && !too_many;

        if let Some(cutflow) = cutflow {
            cutflow.record(objects_seen, objects_passed, pass, weight);
        }
        Ok(SelectionOutcome {
            pass,
            objects_seen,
            objects_passed,
            selected,
        })
    }

    /// Attach the selection outcome to a candidate
    fn decorate(&self, electron: &mut Electron, pass: bool) {
        electron.pass_sel = Some(PassSel::from(pass));
        let keys = if pass {
            &self.cfg.pass_keys
        } else {
            &self.cfg.fail_keys
        };
        electron.aux_flags.extend(keys.iter().cloned());
    }

    /// Publish the view of selected candidates, if one was requested and the
    /// event passed. Views of failed selections are dropped.
    fn publish_view(
        &self,
        store: &mut EventStore,
        input_name: &str,
        output_name: &str,
        pass: bool,
        selected: Option<Vec<usize>>,
    ) {
        let Some(indices) = selected else {
            return;
        };
        if pass {
            let view = ElectronView {
                source: input_name.to_owned(),
                indices,
            };
            if self.cfg.debug {
                debug!(output = %output_name, selected = view.len(), "Publishing view");
            }
            store.record_view(output_name, view);
        } else if self.cfg.debug {
            debug!(output = %output_name, "Discarding view of a failed selection");
        }
    }
}

/// Interpret a configured count, where non-positive values mean "no limit"
fn positive(count: i32) -> Option<usize> {
    usize::try_from(count).ok().filter(|&count| count > 0)
}
