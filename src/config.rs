//! Mechanism for loading and sharing the selection configuration

use crate::{
    elcut::ElectronCut,
    error::config_error,
    numeric::{Float, UNSET_THRESHOLD},
    pid::{IsEmMask, IsolationType, LikelihoodMenu},
};

use eyre::{Result, WrapErr};
use tracing::{info, warn};

use std::{collections::BTreeMap, fmt::Display, fs, path::Path, str::FromStr};

/// Electron selection configuration
#[derive(Clone, Debug)]
pub struct Configuration {
    // ### GENERAL BEHAVIOUR ###
    /// Whether detailed per-event and per-object diagnostics should be emitted
    pub debug: bool,

    /// Whether the stage's counts should be written to the cutflow histograms
    pub use_cutflow: bool,

    // ### INPUTS AND OUTPUTS ###
    /// Name of the input electron collection (variant suffixes get appended)
    pub input_container: String,

    /// Name of the upstream list of systematic variants (empty if none)
    pub input_algo: String,

    /// Name under which the list of passing variants is published
    pub output_algo: String,

    /// Whether evaluated objects should be decorated with their outcome
    pub decorate_selected_objects: bool,

    /// Whether a view of the passing objects should be published
    pub create_selected_container: bool,

    /// Name of the published view (variant suffixes get appended)
    pub output_container: String,

    /// Maximal number of objects to be evaluated per event (<= 0: all)
    pub n_to_process: i32,

    // ### EVENT-LEVEL REQUIREMENTS ###
    /// Maximal number of passing objects for the event to pass (<= 0: none)
    pub pass_max: i32,

    /// Minimal number of passing objects for the event to pass (<= 0: none)
    pub pass_min: i32,

    // ### OBJECT-LEVEL REQUIREMENTS ###
    /// Cuts applied to each electron candidate
    pub electron_cut: ElectronCut,

    // ### IDENTIFICATION ###
    /// Directory of the identification working point definitions
    pub conf_dir_pid: String,

    /// Likelihood identification menu
    pub lh_pid: LikelihoodMenu,

    /// Likelihood working point definition file
    pub lh_operating_point: String,

    /// Cut-based identification working point
    pub cut_based_pid_mask: IsEmMask,

    /// Name of the cut-based identification bit definition
    pub pid_name: String,

    /// Cut-based working point definition file
    pub cut_based_operating_point: String,

    // ### ISOLATION ###
    /// Whether isolation cuts are relative to the candidate's pT
    pub use_relative_iso: bool,

    /// Calorimeter-based isolation variable
    pub calo_based_iso_type: IsolationType,

    /// Calorimeter-based isolation cut
    pub calo_based_iso_cut: Float,

    /// Track-based isolation variable
    pub track_based_iso_type: IsolationType,

    /// Track-based isolation cut
    pub track_based_iso_cut: Float,

    // ### DOWNSTREAM ANNOTATION ###
    /// Flags set on every passing object
    pub pass_keys: Vec<String>,

    /// Flags set on every failing object
    pub fail_keys: Vec<String>,

    /// Keys which were present in the configuration file but not understood
    pub ignored_keys: Vec<String>,
}
//
impl Configuration {
    /// Load the configuration from a file and check it
    pub fn load(file_name: impl AsRef<Path>) -> Result<Self> {
        let file_name = file_name.as_ref();
        let config_str = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Could not read {}", file_name.display()))?;
        Self::parse(&config_str)
    }

    /// Decode and check the contents of a configuration file
    ///
    /// The format is one "Key: value" entry per line. Lines starting with '#'
    /// are comments. Keys which are not specified keep their default value.
    ///
    pub fn parse(config_str: &str) -> Result<Self> {
        let mut items = ConfigItems::new(config_str)?;

        // Decode the configuration items into concrete values
        let mut config = Configuration {
            debug: items.get_bool("Debug", false)?,
            use_cutflow: items.get_bool("UseCutFlow", true)?,
            input_container: items.get_string("InputContainer", ""),
            input_algo: items.get_string("InputAlgo", ""),
            output_algo: items.get_string("OutputAlgo", "ElectronCollection_Sel_Algo"),
            decorate_selected_objects: items.get_bool("DecorateSelectedObjects", true)?,
            create_selected_container: items.get_bool("CreateSelectedContainer", false)?,
            output_container: items.get_string("OutputContainer", ""),
            n_to_process: items.get("NToProcess", -1)?,
            pass_max: items.get("PassMax", -1)?,
            pass_min: items.get("PassMin", -1)?,
            electron_cut: ElectronCut {
                pt_max: items.get("pTMax", UNSET_THRESHOLD)?,
                pt_min: items.get("pTMin", UNSET_THRESHOLD)?,
                eta_max: items.get("etaMax", UNSET_THRESHOLD)?,
                veto_crack: items.get_bool("VetoCrack", true)?,
                d0_max: items.get("d0Max", UNSET_THRESHOLD)?,
                d0sig_max: items.get("d0sigMax", UNSET_THRESHOLD)?,
                z0sintheta_max: items.get("z0sinthetaMax", UNSET_THRESHOLD)?,
                do_author_cut: items.get_bool("DoAuthorCut", true)?,
                do_oq_cut: items.get_bool("DoOQCut", true)?,
                do_lh_pid_cut: items.get_bool("DoLHPIDCut", false)?,
                do_cut_based_pid_cut: items.get_bool("DoCutBasedPIDCut", false)?,
                do_isolation_cut: items.get_bool("DoIsolationCut", false)?,
                debug: false,
            },
            conf_dir_pid: items.get_string("ConfDirPID", "mc15_20150224"),
            lh_pid: items.get("LHPID", LikelihoodMenu::Loose)?,
            lh_operating_point: items.get_string(
                "LHOperatingPoint",
                "ElectronLikelihoodLooseOfflineConfig2015.conf",
            ),
            cut_based_pid_mask: items.get("CutBasedPIDMask", IsEmMask::LoosePP)?,
            pid_name: items.get_string("PIDName", "isEMLoose"),
            cut_based_operating_point: items.get_string(
                "CutBasedOperatingPoint",
                "ElectronIsEMLooseSelectorCutDefs2012.conf",
            ),
            use_relative_iso: items.get_bool("UseRelativeIso", true)?,
            calo_based_iso_type: items.get("CaloBasedIsoType", IsolationType::EtCone20)?,
            calo_based_iso_cut: items.get("CaloBasedIsoCut", 0.05)?,
            track_based_iso_type: items.get("TrackBasedIsoType", IsolationType::PtCone20)?,
            track_based_iso_cut: items.get("TrackBasedIsoCut", 0.05)?,
            pass_keys: split_keys(&items.get_string("PassDecorKeys", "")),
            fail_keys: split_keys(&items.get_string("FailDecorKeys", "")),
            ignored_keys: Vec::new(),
        };
        config.electron_cut.debug = config.debug;
        config.ignored_keys = items.into_leftovers();

        // Without an input, there is nothing to select from
        if config.input_container.is_empty() {
            return Err(config_error!("InputContainer is empty"));
        }

        Ok(config)
    }

    /// Display the effective configuration
    pub fn print(&self) {
        let cut = &self.electron_cut;
        info!("Debug                   : {}", self.debug);
        info!("UseCutFlow              : {}", self.use_cutflow);
        info!("InputContainer          : {}", self.input_container);
        info!("InputAlgo               : {}", self.input_algo);
        info!("OutputAlgo              : {}", self.output_algo);
        info!("DecorateSelectedObjects : {}", self.decorate_selected_objects);
        info!("CreateSelectedContainer : {}", self.create_selected_container);
        info!("OutputContainer         : {}", self.output_container);
        info!("NToProcess              : {}", self.n_to_process);
        info!("PassMax                 : {}", self.pass_max);
        info!("PassMin                 : {}", self.pass_min);
        info!("pTMax                   : {}", cut.pt_max);
        info!("pTMin                   : {}", cut.pt_min);
        info!("etaMax                  : {}", cut.eta_max);
        info!("VetoCrack               : {}", cut.veto_crack);
        info!("d0Max                   : {}", cut.d0_max);
        info!("d0sigMax                : {}", cut.d0sig_max);
        info!("z0sinthetaMax           : {}", cut.z0sintheta_max);
        info!("DoAuthorCut             : {}", cut.do_author_cut);
        info!("DoOQCut                 : {}", cut.do_oq_cut);
        info!("ConfDirPID              : {}", self.conf_dir_pid);
        info!("DoLHPIDCut              : {}", cut.do_lh_pid_cut);
        info!("LHPID                   : {}", self.lh_pid);
        info!("LHOperatingPoint        : {}", self.lh_operating_point);
        info!("DoCutBasedPIDCut        : {}", cut.do_cut_based_pid_cut);
        info!("CutBasedPIDMask         : {}", self.cut_based_pid_mask);
        info!("PIDName                 : {}", self.pid_name);
        info!("CutBasedOperatingPoint  : {}", self.cut_based_operating_point);
        info!("DoIsolationCut          : {}", cut.do_isolation_cut);
        info!("UseRelativeIso          : {}", self.use_relative_iso);
        info!("CaloBasedIsoType        : {}", self.calo_based_iso_type);
        info!("CaloBasedIsoCut         : {}", self.calo_based_iso_cut);
        info!("TrackBasedIsoType       : {}", self.track_based_iso_type);
        info!("TrackBasedIsoCut        : {}", self.track_based_iso_cut);
        info!("PassDecorKeys           : {}", self.pass_keys.join(","));
        info!("FailDecorKeys           : {}", self.fail_keys.join(","));
        for key in &self.ignored_keys {
            warn!(key = %key, "ignoring unknown configuration key");
        }

        // Suspicious but legal combinations
        if self.create_selected_container && self.output_container.is_empty() {
            warn!("CreateSelectedContainer is set, but OutputContainer is empty");
        }
        if self.contradictory_bounds() {
            warn!(
                "PassMin ({}) is larger than PassMax ({}), every event will be rejected",
                self.pass_min, self.pass_max
            );
        }
    }

    /// Truth that the multiplicity requirements cannot be met by any event
    pub fn contradictory_bounds(&self) -> bool {
        self.pass_min > 0 && self.pass_max > 0 && self.pass_min > self.pass_max
    }
}

/// Split a comma-separated list of decoration keys
fn split_keys(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Raw "Key: value" entries of a configuration file, consumed as the
/// configuration struct gets filled in
struct ConfigItems<'data> {
    items: BTreeMap<&'data str, ConfigItem<'data>>,
}
//
impl<'data> ConfigItems<'data> {
    /// Split a configuration file into its entries
    fn new(config_str: &'data str) -> Result<Self> {
        let mut items = BTreeMap::new();
        for (line_idx, line) in config_str.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, data) = line.split_once(':').ok_or_else(|| {
                config_error!("line {} is not a \"Key: value\" pair: {}", line_idx + 1, line)
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(config_error!("line {} has no key", line_idx + 1));
            }
            // Like other key-value stores, the last definition wins
            items.insert(name, ConfigItem::new(name, data.trim()));
        }
        Ok(Self { items })
    }

    /// Parse an item using Rust's standard parsing logic, or use a default
    fn get<T: FromStr>(&mut self, name: &'static str, default: T) -> Result<T>
    where
        <T as FromStr>::Err: Display,
    {
        self.items
            .remove(name)
            .map_or(Ok(default), ConfigItem::parse)
    }

    /// Parse a boolean item, or use a default
    fn get_bool(&mut self, name: &'static str, default: bool) -> Result<bool> {
        self.items
            .remove(name)
            .map_or(Ok(default), ConfigItem::parse_bool)
    }

    /// Fetch a string item, or use a default
    fn get_string(&mut self, name: &'static str, default: &str) -> String {
        self.items
            .remove(name)
            .map_or(default, |item| item.data)
            .to_owned()
    }

    /// Names of the entries which nobody asked for
    fn into_leftovers(self) -> Vec<String> {
        self.items.into_keys().map(str::to_owned).collect()
    }
}

/// A value from the configuration file, tagged with its key for error
/// reporting purposes.
struct ConfigItem<'data> {
    name: &'data str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a key and raw file data
    fn new(name: &'data str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> Result<T>
    where
        <T as FromStr>::Err: Display,
    {
        self.data.parse::<T>().map_err(|e| {
            config_error!("could not parse {} = '{}': {}", self.name, self.data, e)
        })
    }

    /// Parse this data using the lenient boolean syntax of key-value stores
    fn parse_bool(self) -> Result<bool> {
        match self.data.to_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            // Integers are true when non-zero
            _ => self.parse::<i64>().map(|value| value != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{kind_of, SelectionError};

    use std::io::Write;

    fn config_kind(text: &str) -> Option<SelectionError> {
        kind_of(&Configuration::parse(text).unwrap_err()).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Configuration::parse("InputContainer: Electrons").unwrap();
        assert!(!cfg.debug);
        assert!(cfg.use_cutflow);
        assert_eq!(cfg.input_container, "Electrons");
        assert_eq!(cfg.input_algo, "");
        assert_eq!(cfg.output_algo, "ElectronCollection_Sel_Algo");
        assert!(cfg.decorate_selected_objects);
        assert!(!cfg.create_selected_container);
        assert_eq!(cfg.n_to_process, -1);
        assert_eq!((cfg.pass_min, cfg.pass_max), (-1, -1));

        let cut = &cfg.electron_cut;
        assert_eq!(cut.pt_max, UNSET_THRESHOLD);
        assert_eq!(cut.pt_min, UNSET_THRESHOLD);
        assert_eq!(cut.eta_max, UNSET_THRESHOLD);
        assert_eq!(cut.d0_max, UNSET_THRESHOLD);
        assert_eq!(cut.d0sig_max, UNSET_THRESHOLD);
        assert_eq!(cut.z0sintheta_max, UNSET_THRESHOLD);
        assert!(cut.veto_crack && cut.do_author_cut && cut.do_oq_cut);
        assert!(!cut.do_lh_pid_cut && !cut.do_cut_based_pid_cut && !cut.do_isolation_cut);

        assert_eq!(cfg.conf_dir_pid, "mc15_20150224");
        assert_eq!(cfg.lh_pid, LikelihoodMenu::Loose);
        assert_eq!(cfg.cut_based_pid_mask, IsEmMask::LoosePP);
        assert_eq!(cfg.pid_name, "isEMLoose");
        assert!(cfg.use_relative_iso);
        assert_eq!(cfg.calo_based_iso_type, IsolationType::EtCone20);
        assert_eq!(cfg.track_based_iso_type, IsolationType::PtCone20);
        assert_eq!(cfg.calo_based_iso_cut, 0.05);
        assert!(cfg.pass_keys.is_empty() && cfg.fail_keys.is_empty());
        assert!(cfg.ignored_keys.is_empty());
    }

    #[test]
    fn overrides() {
        let cfg = Configuration::parse(
            "# Tight selection\n\
             InputContainer:   Electrons_Calib\n\
             Debug: yes\n\
             InputAlgo: ElectronCalib_Syst\n\
             pTMin: 25e3\n\
             etaMax: 2.47\n\
             VetoCrack: 0\n\
             PassMin: 2\n\
             LHPID: VeryTight\n\
             CutBasedPIDMask: ElectronMediumHLT\n\
             CaloBasedIsoType: topoetcone30\n\
             PassDecorKeys: isLoose, isTight,\n\
             FailDecorKeys:\n\
             SomethingElse: 42\n",
        )
        .unwrap();
        assert_eq!(cfg.input_container, "Electrons_Calib");
        assert!(cfg.debug && cfg.electron_cut.debug);
        assert_eq!(cfg.input_algo, "ElectronCalib_Syst");
        assert_eq!(cfg.electron_cut.pt_min, 25e3);
        assert_eq!(cfg.electron_cut.eta_max, 2.47);
        assert!(!cfg.electron_cut.veto_crack);
        assert_eq!(cfg.pass_min, 2);
        assert_eq!(cfg.lh_pid, LikelihoodMenu::VeryTight);
        assert_eq!(cfg.cut_based_pid_mask, IsEmMask::MediumHlt);
        assert_eq!(cfg.calo_based_iso_type, IsolationType::TopoEtCone30);
        assert_eq!(cfg.pass_keys, ["isLoose", "isTight"]);
        assert!(cfg.fail_keys.is_empty());
        assert_eq!(cfg.ignored_keys, ["SomethingElse"]);
    }

    #[test]
    fn empty_input_container() {
        assert_eq!(
            config_kind("Debug: false"),
            Some(SelectionError::Configuration("InputContainer is empty".to_owned()))
        );
        assert!(Configuration::parse("InputContainer:").is_err());
    }

    #[test]
    fn unknown_working_points() {
        let err = config_kind("InputContainer: Electrons\nLHPID: Loosest");
        assert!(matches!(err, Some(SelectionError::Configuration(msg)) if msg.contains("Loosest")));
        let err = config_kind("InputContainer: Electrons\nCutBasedPIDMask: LooseHLT");
        assert!(matches!(err, Some(SelectionError::Configuration(_))));
        let err = config_kind("InputContainer: Electrons\nTrackBasedIsoType: ptcone99");
        assert!(matches!(err, Some(SelectionError::Configuration(_))));
    }

    #[test]
    fn malformed_values() {
        let err = config_kind("InputContainer: Electrons\nNToProcess: many");
        assert!(matches!(err, Some(SelectionError::Configuration(msg)) if msg.contains("NToProcess")));
        let err = config_kind("InputContainer: Electrons\nDoOQCut: maybe");
        assert!(matches!(err, Some(SelectionError::Configuration(_))));
        let err = config_kind("InputContainer: Electrons\nthis line has no separator");
        assert!(matches!(err, Some(SelectionError::Configuration(msg)) if msg.contains("line 2")));
    }

    #[test]
    fn suspicious_but_legal() {
        let cfg = Configuration::parse("InputContainer: E\nCreateSelectedContainer: true").unwrap();
        assert!(cfg.create_selected_container);
        assert_eq!(cfg.output_container, "");

        let cfg = Configuration::parse("InputContainer: E\nPassMin: 3\nPassMax: 2").unwrap();
        assert_eq!((cfg.pass_min, cfg.pass_max), (3, 2));
        assert!(cfg.contradictory_bounds());

        // A single active bound is never contradictory
        let cfg = Configuration::parse("InputContainer: E\nPassMin: 3\nPassMax: -1").unwrap();
        assert!(!cfg.contradictory_bounds());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "InputContainer: Electrons\nd0sigMax: 5").unwrap();
        let cfg = Configuration::load(file.path()).unwrap();
        assert_eq!(cfg.electron_cut.d0sig_max, 5.);

        let missing = file.path().with_extension("missing");
        assert!(Configuration::load(missing).is_err());
    }
}
