//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as reals;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as reals;

/// Sentinel value which marks a kinematic threshold as "not configured"
///
/// Kinematic cuts (pT and |eta| bounds) are only applied when their threshold
/// differs from this value. It is exactly representable in single precision.
///
pub const UNSET_THRESHOLD: Float = 1e8;
