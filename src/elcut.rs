//! Mechanism to apply cuts to electron candidates

use crate::{
    electron::{author, Electron, Vertex},
    numeric::{Float, UNSET_THRESHOLD},
    tools::SelectionTools,
};

use prefix_num_ops::real::*;
use tracing::debug;

use std::fmt;

/// Lower |eta| edge of the barrel/endcap calorimeter transition region
pub const CRACK_ETA_MIN: Float = 1.37;

/// Upper |eta| edge of the barrel/endcap calorimeter transition region
pub const CRACK_ETA_MAX: Float = 1.52;

/// Individual cuts, in the order in which they are evaluated
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cut {
    Author,
    ObjectQuality,
    PtMax,
    PtMin,
    EtaMax,
    EtaCrack,
    D0,
    D0Significance,
    Z0SinTheta,
    LikelihoodPid,
    CutBasedPid,
    Isolation,
}
//
impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Author => "author",
            Self::ObjectQuality => "object quality",
            Self::PtMax => "pT max",
            Self::PtMin => "pT min",
            Self::EtaMax => "|eta| max",
            Self::EtaCrack => "|eta| crack veto",
            Self::D0 => "d0",
            Self::D0Significance => "d0 significance",
            Self::Z0SinTheta => "z0*sin(theta)",
            Self::LikelihoodPid => "likelihood PID",
            Self::CutBasedPid => "cut-based PID",
            Self::Isolation => "isolation",
        })
    }
}

/// Cuts on electron candidates
///
/// Kinematic bounds (pT, |eta|) are disabled by setting them to
/// `UNSET_THRESHOLD`. Impact parameter bounds have no such escape hatch and
/// are always applied, so leaving them at `UNSET_THRESHOLD` merely makes them
/// very loose. Structural, identification and isolation cuts have their own
/// on/off switch.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ElectronCut {
    /// Require the electron or ambiguous author
    pub do_author_cut: bool,

    /// Reject candidates with badly measured clusters
    pub do_oq_cut: bool,

    /// Maximal transverse momentum
    pub pt_max: Float,

    /// Minimal transverse momentum
    pub pt_min: Float,

    /// Maximal |eta|
    pub eta_max: Float,

    /// Reject candidates in the calorimeter transition region
    pub veto_crack: bool,

    /// Maximal transverse impact parameter (signed)
    pub d0_max: Float,

    /// Maximal transverse impact parameter significance
    pub d0sig_max: Float,

    /// Maximal |z0 sin(theta)| with respect to the primary vertex
    pub z0sintheta_max: Float,

    /// Apply the likelihood-based identification
    pub do_lh_pid_cut: bool,

    /// Apply the cut-based identification
    pub do_cut_based_pid_cut: bool,

    /// Apply the isolation requirements
    pub do_isolation_cut: bool,

    /// Report which cut rejected each candidate
    pub debug: bool,
}
//
impl ElectronCut {
    /// Decide whether an electron candidate passes the cuts
    pub fn keep(&self, electron: &Electron, primary_vertex: &Vertex, tools: &SelectionTools) -> bool {
        match self.first_failure(electron, primary_vertex, tools) {
            None => true,
            Some(cut) => {
                if self.debug {
                    debug!(pt = electron.pt, eta = electron.eta, "Electron failed {cut} cut");
                }
                false
            }
        }
    }

    /// Find the first cut which rejects an electron candidate, if any
    ///
    /// Cuts are evaluated in a fixed order and evaluation stops at the first
    /// failure, so the cheap cuts shield the expensive tool calls.
    ///
    pub fn first_failure(
        &self,
        electron: &Electron,
        primary_vertex: &Vertex,
        tools: &SelectionTools,
    ) -> Option<Cut> {
        // Author
        if self.do_author_cut && !electron.has_author(author::ELECTRON | author::AMBIGUOUS) {
            return Some(Cut::Author);
        }

        // Object quality
        if self.do_oq_cut && electron.bad_quality_bits() != 0 {
            return Some(Cut::ObjectQuality);
        }

        // Transverse momentum
        let pt = electron.pt;
        if self.pt_max != UNSET_THRESHOLD && pt > self.pt_max {
            return Some(Cut::PtMax);
        }
        if self.pt_min != UNSET_THRESHOLD && pt < self.pt_min {
            return Some(Cut::PtMin);
        }

        // Pseudorapidity
        let abs_eta = abs(electron.eta);
        if self.eta_max != UNSET_THRESHOLD && abs_eta > self.eta_max {
            return Some(Cut::EtaMax);
        }
        if self.veto_crack && abs_eta > CRACK_ETA_MIN && abs_eta < CRACK_ETA_MAX {
            return Some(Cut::EtaCrack);
        }

        // Impact parameters. These comparisons are written so that NaNs fail.
        let track = &electron.track;
        if !(track.d0 < self.d0_max) {
            return Some(Cut::D0);
        }
        let d0_significance = abs(track.d0) / sqrt(track.d0_variance());
        if !(d0_significance < self.d0sig_max) {
            return Some(Cut::D0Significance);
        }
        let z0sintheta = (track.z0 + track.vz - primary_vertex.z) * sin(track.theta);
        if !(abs(z0sintheta) < self.z0sintheta_max) {
            return Some(Cut::Z0SinTheta);
        }

        // Identification and isolation, delegated to the dedicated tools
        if self.do_lh_pid_cut && !tools.likelihood.accept(electron) {
            return Some(Cut::LikelihoodPid);
        }
        if self.do_cut_based_pid_cut && !tools.cut_based.accept(electron) {
            return Some(Cut::CutBasedPid);
        }
        if self.do_isolation_cut && !tools.isolation.accept(electron) {
            return Some(Cut::Isolation);
        }
        None
    }
}
