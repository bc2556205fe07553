//! Named electron identification and isolation working points
//!
//! The configuration refers to working points by name. Each family of names
//! is a closed enum with a fixed lookup table, so that a typo is caught once,
//! at configuration time, instead of silently selecting nothing.

use serde::Deserialize;

use std::{fmt, str::FromStr};

/// Error produced when a working point name is not in its lookup table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownName {
    /// What kind of name was being looked up
    pub family: &'static str,

    /// The offending name
    pub name: String,
}
//
impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.family, self.name)
    }
}
//
impl std::error::Error for UnknownName {}

/// Generate a closed enum whose variants map one-to-one to fixed names
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $family:literal => $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $label:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[allow(missing_docs)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )*
        }
        //
        impl $name {
            /// Lookup table from configuration names to working points
            pub const ALL: &'static [(&'static str, Self)] = &[ $( ($label, Self::$variant), )* ];

            /// Name under which this working point is configured
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )*
                }
            }
        }
        //
        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .find(|(label, _)| *label == s)
                    .map(|&(_, value)| value)
                    .ok_or_else(|| UnknownName {
                        family: $family,
                        name: s.to_owned(),
                    })
            }
        }
        //
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_enum! {
    /// Likelihood-based identification menu
    "likelihood PID menu" => LikelihoodMenu {
        VeryLoose = "VeryLoose",
        Loose = "Loose",
        Medium = "Medium",
        Tight = "Tight",
        VeryTight = "VeryTight",
        LooseRelaxed = "LooseRelaxed",
    }
}

named_enum! {
    /// Cut-based (isEM) identification working point
    "cut-based PID mask" => IsEmMask {
        LoosePP = "ElectronLoosePP",
        Loose1 = "ElectronLoose1",
        MediumPP = "ElectronMediumPP",
        Medium1 = "ElectronMedium1",
        TightPP = "ElectronTightPP",
        Tight1 = "ElectronTight1",
        LooseHlt = "ElectronLooseHLT",
        MediumHlt = "ElectronMediumHLT",
        TightHlt = "ElectronTightHLT",
    }
}

named_enum! {
    /// Isolation variable, named after its cone size in units of 0.01
    "isolation type" => IsolationType {
        EtCone20 = "etcone20",
        EtCone30 = "etcone30",
        EtCone40 = "etcone40",
        TopoEtCone20 = "topoetcone20",
        TopoEtCone30 = "topoetcone30",
        TopoEtCone40 = "topoetcone40",
        PtCone20 = "ptcone20",
        PtCone30 = "ptcone30",
        PtCone40 = "ptcone40",
        PtVarCone20 = "ptvarcone20",
        PtVarCone30 = "ptvarcone30",
        PtVarCone40 = "ptvarcone40",
    }
}

impl IsolationType {
    /// Truth that this variable sums calorimeter energy deposits
    pub fn is_calo_based(self) -> bool {
        matches!(
            self,
            Self::EtCone20
                | Self::EtCone30
                | Self::EtCone40
                | Self::TopoEtCone20
                | Self::TopoEtCone30
                | Self::TopoEtCone40
        )
    }

    /// Truth that this variable sums track momenta
    pub fn is_track_based(self) -> bool {
        !self.is_calo_based()
    }
}

/// Bits of the isEM word, one per cut-based identification criterion
///
/// A set bit in an electron's isEM word means that the corresponding
/// criterion failed.
///
#[allow(missing_docs)]
pub mod is_em_bits {
    pub const CLUSTER_ETA_RANGE: u32 = 1 << 0;
    pub const CONVERSION_MATCH: u32 = 1 << 1;
    pub const CLUSTER_HADRONIC_LEAKAGE: u32 = 1 << 2;
    pub const CLUSTER_MIDDLE_ENERGY: u32 = 1 << 3;
    pub const CLUSTER_MIDDLE_ERATIO37: u32 = 1 << 4;
    pub const CLUSTER_MIDDLE_ERATIO33: u32 = 1 << 5;
    pub const CLUSTER_MIDDLE_WIDTH: u32 = 1 << 6;
    pub const CLUSTER_STRIPS_ERATIO: u32 = 1 << 8;
    pub const CLUSTER_STRIPS_DELTA_EMAX2: u32 = 1 << 9;
    pub const CLUSTER_STRIPS_DELTA_E: u32 = 1 << 10;
    pub const CLUSTER_STRIPS_WTOT: u32 = 1 << 11;
    pub const CLUSTER_STRIPS_FRACM: u32 = 1 << 12;
    pub const CLUSTER_STRIPS_WETA1C: u32 = 1 << 13;
    pub const TRACK_BLAYER: u32 = 1 << 16;
    pub const TRACK_PIXEL: u32 = 1 << 17;
    pub const TRACK_SI: u32 = 1 << 18;
    pub const TRACK_A0: u32 = 1 << 19;
    pub const TRACK_MATCH_ETA: u32 = 1 << 20;
    pub const TRACK_MATCH_PHI: u32 = 1 << 21;
    pub const TRACK_MATCH_EOVERP: u32 = 1 << 22;
    pub const TRACK_TRT_HITS: u32 = 1 << 24;
    pub const TRACK_TRT_RATIO: u32 = 1 << 25;
    pub const TRACK_A0_TIGHT: u32 = 1 << 27;
    pub const TRACK_MATCH_ETA_TIGHT: u32 = 1 << 28;
}

impl IsEmMask {
    /// isEM bits which must all be clear for an electron to be accepted
    pub fn bits(self) -> u32 {
        use is_em_bits::*;

        // Calorimeter-only criteria, shared by every working point
        const CALO_LOOSE: u32 = CLUSTER_ETA_RANGE
            | CLUSTER_HADRONIC_LEAKAGE
            | CLUSTER_MIDDLE_ERATIO37
            | CLUSTER_MIDDLE_WIDTH;
        const CALO_MEDIUM: u32 = CALO_LOOSE
            | CLUSTER_MIDDLE_ENERGY
            | CLUSTER_STRIPS_ERATIO
            | CLUSTER_STRIPS_DELTA_EMAX2
            | CLUSTER_STRIPS_DELTA_E
            | CLUSTER_STRIPS_WTOT
            | CLUSTER_STRIPS_FRACM
            | CLUSTER_STRIPS_WETA1C;
        const CALO_TIGHT: u32 = CALO_MEDIUM | CLUSTER_MIDDLE_ERATIO33;

        // Track quality and track-cluster matching criteria
        const TRACK_LOOSE: u32 = TRACK_PIXEL | TRACK_SI | TRACK_MATCH_ETA;
        const TRACK_MEDIUM: u32 = TRACK_LOOSE | TRACK_BLAYER | TRACK_A0 | TRACK_TRT_HITS;
        const TRACK_TIGHT: u32 = TRACK_MEDIUM
            | TRACK_MATCH_PHI
            | TRACK_MATCH_EOVERP
            | TRACK_TRT_RATIO
            | TRACK_A0_TIGHT
            | TRACK_MATCH_ETA_TIGHT;

        match self {
            // "1" menus predate the "PP" ones and only look at the calorimeter
            // at the loose level
            Self::Loose1 => CALO_LOOSE,
            Self::LoosePP => CALO_MEDIUM | TRACK_LOOSE,
            Self::Medium1 => CALO_MEDIUM | TRACK_LOOSE,
            Self::MediumPP => CALO_MEDIUM | TRACK_MEDIUM,
            Self::Tight1 => CALO_TIGHT | TRACK_TIGHT,
            Self::TightPP => CALO_TIGHT | TRACK_TIGHT | CONVERSION_MATCH,
            // Trigger menus do without the impact parameter and TRT criteria
            Self::LooseHlt => CALO_MEDIUM | TRACK_PIXEL | TRACK_SI,
            Self::MediumHlt => CALO_MEDIUM | TRACK_LOOSE | TRACK_BLAYER,
            Self::TightHlt => {
                CALO_TIGHT | TRACK_LOOSE | TRACK_BLAYER | TRACK_MATCH_PHI | TRACK_MATCH_EOVERP
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likelihood_names() {
        for &(label, menu) in LikelihoodMenu::ALL {
            assert_eq!(label.parse::<LikelihoodMenu>(), Ok(menu));
            assert_eq!(menu.to_string(), label);
        }
        assert_eq!(LikelihoodMenu::ALL.len(), 6);
        let err = "Loosest".parse::<LikelihoodMenu>().unwrap_err();
        assert_eq!(err.to_string(), "unknown likelihood PID menu 'Loosest'");
    }

    #[test]
    fn is_em_names() {
        assert_eq!(IsEmMask::ALL.len(), 9);
        assert_eq!("ElectronTightHLT".parse(), Ok(IsEmMask::TightHlt));
        // Names are case sensitive, like the rest of the configuration
        assert!("electronloosepp".parse::<IsEmMask>().is_err());
        // The trigger menu is only known by its full name
        assert!("LooseHLT".parse::<IsEmMask>().is_err());
    }

    #[test]
    fn is_em_masks_tighten() {
        let pairs = [
            (IsEmMask::LoosePP, IsEmMask::MediumPP),
            (IsEmMask::MediumPP, IsEmMask::TightPP),
            (IsEmMask::Loose1, IsEmMask::Medium1),
            (IsEmMask::Medium1, IsEmMask::Tight1),
            (IsEmMask::LooseHlt, IsEmMask::MediumHlt),
            (IsEmMask::MediumHlt, IsEmMask::TightHlt),
        ];
        for (looser, tighter) in pairs {
            assert_eq!(
                looser.bits() & tighter.bits(),
                looser.bits(),
                "{tighter} should require everything {looser} requires"
            );
            assert_ne!(looser.bits(), tighter.bits());
        }
    }

    #[test]
    fn isolation_families() {
        let calo: Vec<_> = IsolationType::ALL
            .iter()
            .filter(|(_, ty)| ty.is_calo_based())
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(
            calo,
            ["etcone20", "etcone30", "etcone40", "topoetcone20", "topoetcone30", "topoetcone40"]
        );
        assert!(IsolationType::PtVarCone30.is_track_based());
    }
}
