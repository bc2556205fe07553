//! Electron selection: a per-event filtering stage for collider analyses
//!
//!
//! # Introduction (for the physicist)
//!
//! This stage receives calibrated electron candidates, applies kinematic,
//! track impact parameter, identification and isolation cuts to each of them,
//! decides whether the event passes from the number of surviving candidates,
//! and keeps track of how many objects and events survived in cutflow
//! histograms.
//!
//! When an upstream stage produced systematic variants of the electron
//! collection, each variant is selected independently. The event is kept if
//! any variant passes, and downstream stages are told which variants did.
//!
//!
//! # Introduction (for the computer guy)
//!
//! * read in the configuration and set up the decision tools
//! * loop over events, in batches which may be processed in parallel,
//!     * fetch the event weight and primary vertex,
//!     * select the candidates of each collection, decorating them in place,
//!     * publish views of the selected candidates and the passing variants
//! * then merge the per-batch counters and write down the cutflow.

#![warn(missing_docs)]

pub mod config;
pub mod cutflow;
pub mod elcut;
pub mod electron;
pub mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod numeric;
pub mod output;
pub mod pid;
pub mod scheduling;
pub mod selector;
pub mod tools;
