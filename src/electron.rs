//! This module defines the reconstructed objects consumed by the selection:
//! electron candidates, their tracks, and interaction vertices

use crate::{
    numeric::Float,
    pid::{IsolationType, LikelihoodMenu},
};

use nalgebra::Matrix5;
use serde::Deserialize;

use std::collections::{BTreeMap, BTreeSet};

/// Bits of the egamma author word
pub mod author {
    /// Reconstructed by the standard electron algorithm
    pub const ELECTRON: u16 = 0x1;

    /// Reconstructed by the forward electron algorithm
    pub const FORWARD: u16 = 0x2;

    /// Reconstructed by the photon algorithm
    pub const PHOTON: u16 = 0x4;

    /// Ambiguous between electron and photon
    pub const AMBIGUOUS: u16 = 0x8;
}

/// Mask of object-quality bits which flag a badly measured cluster
pub const BAD_OBJECT_QUALITY: u32 = 1446;

/// Outcome of the selection for one object, as decorated onto it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassSel {
    /// The object was evaluated and failed at least one cut
    Fail,

    /// The object was evaluated and passed all cuts
    Pass,

    /// The object was not evaluated because the processing cap was reached
    NotEvaluated,
}
//
impl PassSel {
    /// Numerical encoding used by downstream consumers (1, 0 or -1)
    pub fn value(self) -> i8 {
        match self {
            Self::Fail => 0,
            Self::Pass => 1,
            Self::NotEvaluated => -1,
        }
    }
}
//
impl From<bool> for PassSel {
    fn from(pass: bool) -> Self {
        if pass {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// Reconstructed electron candidate
#[derive(Clone, Debug, Deserialize)]
pub struct Electron {
    /// Transverse momentum (MeV)
    pub pt: Float,

    /// Pseudorapidity
    pub eta: Float,

    /// Azimuthal angle
    #[serde(default)]
    pub phi: Float,

    /// Object-quality word of the calorimeter cluster
    #[serde(rename = "OQ", default)]
    pub oq: u32,

    /// Author bit-field (see the `author` module)
    pub author: u16,

    /// Associated inner detector track
    pub track: TrackParticle,

    /// Cut-based identification word (a set bit is a failed criterion)
    #[serde(rename = "isEM", default)]
    pub is_em: u32,

    /// Likelihood identification menus satisfied by this candidate
    #[serde(default)]
    pub lh_menus: BTreeSet<LikelihoodMenu>,

    /// Isolation variables (MeV)
    #[serde(default)]
    pub isolation: BTreeMap<IsolationType, Float>,

    /// Selection decoration, set once the selection stage has run
    #[serde(skip)]
    pub pass_sel: Option<PassSel>,

    /// Auxiliary flags attached by the selection stage for downstream use
    #[serde(skip)]
    pub aux_flags: BTreeSet<String>,
}
//
impl Electron {
    /// Build an undecorated candidate with no identification information
    pub fn new(pt: Float, eta: Float, author: u16, track: TrackParticle) -> Self {
        Self {
            pt,
            eta,
            phi: 0.,
            oq: 0,
            author,
            track,
            is_em: 0,
            lh_menus: BTreeSet::new(),
            isolation: BTreeMap::new(),
            pass_sel: None,
            aux_flags: BTreeSet::new(),
        }
    }

    /// Truth that any of the given author bits is set
    pub fn has_author(&self, bits: u16) -> bool {
        self.author & bits != 0
    }

    /// Object-quality bits which flag a bad cluster
    pub fn bad_quality_bits(&self) -> u32 {
        self.oq & BAD_OBJECT_QUALITY
    }
}

/// Number of packed elements in a symmetric 5x5 covariance matrix
const PACKED_COV_LEN: usize = 15;

/// Inner detector track, described by its perigee parameters
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawTrack")]
pub struct TrackParticle {
    /// Transverse impact parameter (mm)
    pub d0: Float,

    /// Longitudinal impact parameter, relative to the reference point (mm)
    pub z0: Float,

    /// z coordinate of the reference point (mm)
    pub vz: Float,

    /// Polar angle
    pub theta: Float,

    /// Covariance of the defining parameters (d0, z0, phi, theta, q/p)
    pub covariance: Matrix5<Float>,
}
//
impl TrackParticle {
    /// Variance of the transverse impact parameter
    pub fn d0_variance(&self) -> Float {
        self.covariance[(0, 0)]
    }

    /// Unpack a covariance matrix stored as its lower triangle, row by row
    pub fn unpack_covariance(packed: &[Float]) -> Option<Matrix5<Float>> {
        if packed.len() != PACKED_COV_LEN {
            return None;
        }
        let mut covariance = Matrix5::zeros();
        let mut elems = packed.iter();
        for row in 0..5 {
            for col in 0..=row {
                let value = *elems.next()?;
                covariance[(row, col)] = value;
                covariance[(col, row)] = value;
            }
        }
        Some(covariance)
    }
}

/// Serialized form of a track, with a packed covariance matrix
#[derive(Deserialize)]
struct RawTrack {
    d0: Float,
    z0: Float,
    #[serde(default)]
    vz: Float,
    theta: Float,
    #[serde(rename = "definingParametersCovMatrix")]
    cov_matrix_vec: Vec<Float>,
}
//
impl TryFrom<RawTrack> for TrackParticle {
    type Error = String;

    fn try_from(raw: RawTrack) -> Result<Self, Self::Error> {
        let covariance = Self::unpack_covariance(&raw.cov_matrix_vec).ok_or_else(|| {
            format!(
                "expected {PACKED_COV_LEN} packed covariance elements, got {}",
                raw.cov_matrix_vec.len()
            )
        })?;
        Ok(Self {
            d0: raw.d0,
            z0: raw.z0,
            vz: raw.vz,
            theta: raw.theta,
            covariance,
        })
    }
}

/// Vertex type code of the hard-scatter primary vertex
pub const PRIMARY_VERTEX_TYPE: i32 = 1;

/// Reconstructed interaction vertex
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Vertex {
    /// Transverse position (mm)
    #[serde(default)]
    pub x: Float,

    /// Transverse position (mm)
    #[serde(default)]
    pub y: Float,

    /// Longitudinal position (mm)
    pub z: Float,

    /// Vertex type code (primary, pile-up, secondary...)
    #[serde(rename = "vertexType")]
    pub vertex_type: i32,
}
//
impl Vertex {
    /// Build a hard-scatter primary vertex at the given z position
    pub fn primary(z: Float) -> Self {
        Self {
            x: 0.,
            y: 0.,
            z,
            vertex_type: PRIMARY_VERTEX_TYPE,
        }
    }

    /// Truth that this is the hard-scatter primary vertex
    pub fn is_primary(&self) -> bool {
        self.vertex_type == PRIMARY_VERTEX_TYPE
    }
}
