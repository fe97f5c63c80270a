//! # surveyor-core
//!
//! Domain model for incremental star-system survey reconstruction.
//!
//! - **Survey**: Flat per-body observation record. Absent fields hold type
//!   defaults; [`Survey::merge`] fills them from later observations without
//!   disturbing values already present.
//! - **Entities**: [`StarSystem`] and [`Body`], keyed by system address and
//!   body name, with the same left-biased merge semantics at every level.
//! - **Prediction**: [`Predictor`] trait plus the linear [`WeightModel`]
//!   scorer loaded from a JSON weight resource.
//! - **Errors**: [`CoreError`] via `thiserror`.

#![deny(unsafe_code)]

pub mod errors;
pub mod predict;
pub mod survey;
pub mod system;

pub use errors::CoreError;
pub use predict::{feature_vector, Predictor, WeightModel};
pub use survey::Survey;
pub use system::{Body, StarSystem, SystemAddress, UNFOCUSED, UNKNOWN_NAME};
