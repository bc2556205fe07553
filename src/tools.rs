//! Identification and isolation decision tools
//!
//! The selection only ever asks these tools one question: does this electron
//! pass? They are therefore modeled as opaque predicates, which are built
//! once at initialization time and then shared by all events.

use crate::{
    config::Configuration,
    electron::Electron,
    error::tool_error,
    numeric::Float,
    pid::{IsEmMask, IsolationType, LikelihoodMenu},
};

use eyre::Result;
use tracing::info;

/// Directory under which identification working points are defined
const PID_CONF_ROOT: &str = "ElectronPhotonSelectorTools/offline";

/// Accept/reject decision on one electron candidate
pub trait ElectronPredicate: Send + Sync {
    /// Truth that the candidate passes this tool's requirements
    fn accept(&self, electron: &Electron) -> bool;
}
//
impl<F> ElectronPredicate for F
where
    F: Fn(&Electron) -> bool + Send + Sync,
{
    fn accept(&self, electron: &Electron) -> bool {
        self(electron)
    }
}

/// Set of decision tools used by the electron cuts
pub struct SelectionTools {
    /// Likelihood-based identification
    pub likelihood: Box<dyn ElectronPredicate>,

    /// Cut-based (isEM) identification
    pub cut_based: Box<dyn ElectronPredicate>,

    /// Isolation requirements
    pub isolation: Box<dyn ElectronPredicate>,
}
//
impl SelectionTools {
    /// Bundle externally provided decision tools
    pub fn new(
        likelihood: impl ElectronPredicate + 'static,
        cut_based: impl ElectronPredicate + 'static,
        isolation: impl ElectronPredicate + 'static,
    ) -> Self {
        Self {
            likelihood: Box::new(likelihood),
            cut_based: Box::new(cut_based),
            isolation: Box::new(isolation),
        }
    }

    /// Set up the standard decision tools of a selection stage
    ///
    /// All tools are initialized, even those whose cut is disabled, so that
    /// a broken working point is reported no matter how cuts are toggled.
    ///
    pub fn from_config(stage_name: &str, cfg: &Configuration) -> Result<Self> {
        let conf_dir = format!("{}/{}", PID_CONF_ROOT, cfg.conf_dir_pid);
        let likelihood = LikelihoodTool::new(
            format!("AsgElectronLikelihoodTool_{stage_name}"),
            &conf_dir,
            &cfg.lh_operating_point,
            cfg.lh_pid,
        )?;
        let cut_based = IsEmSelector::new(
            format!("AsgElectronIsEMSelector_{stage_name}"),
            &conf_dir,
            &cfg.cut_based_operating_point,
            cfg.cut_based_pid_mask,
        )?;
        let mut isolation =
            IsolationSelector::new(format!("ElectronIsolationSelectionTool_{stage_name}"));
        isolation.configure_cut(
            cfg.calo_based_iso_type,
            cfg.calo_based_iso_cut,
            cfg.use_relative_iso,
        )?;
        isolation.configure_cut(
            cfg.track_based_iso_type,
            cfg.track_based_iso_cut,
            cfg.use_relative_iso,
        )?;
        isolation.initialize()?;
        Ok(Self::new(likelihood, cut_based, isolation))
    }
}

/// Build the path of a working point definition, checking that it is named
fn operating_point_path(tool: &str, conf_dir: &str, file_name: &str) -> Result<String> {
    if file_name.is_empty() {
        return Err(tool_error!("{tool}: no operating point definition file"));
    }
    Ok(format!("{conf_dir}/{file_name}"))
}

/// Likelihood-based identification tool
///
/// The likelihood discriminant is evaluated upstream; candidates carry the set
/// of menus they satisfy and this tool checks the configured one.
///
pub struct LikelihoodTool {
    /// Tool instance name
    name: String,

    /// Working point definition in use
    config_file: String,

    /// Menu required by this tool
    menu: LikelihoodMenu,
}
//
impl LikelihoodTool {
    /// Set up the tool for a given menu
    pub fn new(
        name: String,
        conf_dir: &str,
        operating_point: &str,
        menu: LikelihoodMenu,
    ) -> Result<Self> {
        let config_file = operating_point_path(&name, conf_dir, operating_point)?;
        info!(tool = %name, config = %config_file, menu = %menu, "initialized likelihood tool");
        Ok(Self {
            name,
            config_file,
            menu,
        })
    }
}
//
impl ElectronPredicate for LikelihoodTool {
    fn accept(&self, electron: &Electron) -> bool {
        electron.lh_menus.contains(&self.menu)
    }
}
//
impl std::fmt::Debug for LikelihoodTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.menu, self.config_file)
    }
}

/// Cut-based identification tool, which checks bits of the isEM word
pub struct IsEmSelector {
    /// Tool instance name
    name: String,

    /// Working point definition in use
    config_file: String,

    /// Criteria which must be satisfied
    mask: IsEmMask,
}
//
impl IsEmSelector {
    /// Set up the tool for a given working point
    pub fn new(name: String, conf_dir: &str, operating_point: &str, mask: IsEmMask) -> Result<Self> {
        let config_file = operating_point_path(&name, conf_dir, operating_point)?;
        info!(tool = %name, config = %config_file, mask = %mask, "initialized isEM selector");
        Ok(Self {
            name,
            config_file,
            mask,
        })
    }
}
//
impl ElectronPredicate for IsEmSelector {
    fn accept(&self, electron: &Electron) -> bool {
        electron.is_em & self.mask.bits() == 0
    }
}
//
impl std::fmt::Debug for IsEmSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.mask, self.config_file)
    }
}

/// Upper bound on one isolation variable
#[derive(Clone, Copy, Debug, PartialEq)]
struct IsolationCut {
    /// Isolation variable
    iso_type: IsolationType,

    /// Largest accepted value (exclusive)
    cut: Float,

    /// Whether the variable is divided by the candidate's pT first
    relative: bool,
}
//
impl IsolationCut {
    /// Check a candidate against this bound, rejecting it if the variable
    /// was not computed upstream
    fn accept(&self, electron: &Electron) -> bool {
        let Some(&value) = electron.isolation.get(&self.iso_type) else {
            return false;
        };
        let value = if self.relative {
            value / electron.pt
        } else {
            value
        };
        value < self.cut
    }
}

/// Isolation tool, combining one calorimeter-based and one track-based cut
#[derive(Debug)]
pub struct IsolationSelector {
    /// Tool instance name
    name: String,

    /// Calorimeter-based requirement
    calo: Option<IsolationCut>,

    /// Track-based requirement
    track: Option<IsolationCut>,
}
//
impl IsolationSelector {
    /// Create an unconfigured isolation tool
    pub fn new(name: String) -> Self {
        Self {
            name,
            calo: None,
            track: None,
        }
    }

    /// Require a given isolation variable to be below some cut
    ///
    /// The variable's family decides whether it replaces the calorimeter-based
    /// or the track-based requirement.
    ///
    pub fn configure_cut(
        &mut self,
        iso_type: IsolationType,
        cut: Float,
        relative: bool,
    ) -> Result<()> {
        if !(cut > 0.) {
            return Err(tool_error!(
                "{}: isolation cut on {} must be positive, got {}",
                self.name,
                iso_type,
                cut
            ));
        }
        let iso_cut = IsolationCut {
            iso_type,
            cut,
            relative,
        };
        if iso_type.is_calo_based() {
            self.calo = Some(iso_cut);
        } else {
            self.track = Some(iso_cut);
        }
        Ok(())
    }

    /// Check that both a calorimeter-based and a track-based cut are set up
    pub fn initialize(&self) -> Result<()> {
        if self.calo.is_none() {
            return Err(tool_error!(
                "{}: no calorimeter-based isolation cut configured",
                self.name
            ));
        }
        if self.track.is_none() {
            return Err(tool_error!(
                "{}: no track-based isolation cut configured",
                self.name
            ));
        }
        info!(tool = %self.name, calo = ?self.calo, track = ?self.track, "initialized isolation tool");
        Ok(())
    }
}
//
impl ElectronPredicate for IsolationSelector {
    fn accept(&self, electron: &Electron) -> bool {
        self.calo
            .iter()
            .chain(self.track.iter())
            .all(|cut| cut.accept(electron))
    }
}
