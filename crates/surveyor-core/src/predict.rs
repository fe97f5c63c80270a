//! Value scoring: feature extraction and the linear weight model.
//!
//! Scoring is consumed through the [`Predictor`] trait so the rest of
//! the pipeline never sees model internals. The shipped implementation
//! is [`WeightModel`], a linear scorer over the same feature space the
//! historical models were trained on: the numeric survey columns, a
//! one-hot sub-type indicator, and a lowercased word-bag over the
//! observed genera.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::survey::Survey;

/// Opaque scoring capability. Implementations are pure and synchronous.
pub trait Predictor: Send + Sync {
    /// Score a survey. Missing measurements read as zero features.
    fn predict(&self, survey: &Survey) -> f32;
}

/// Numeric feature columns in training order, named with their wire
/// (camelCase) spellings so weight tables match stored records.
#[allow(clippy::cast_precision_loss)]
fn numeric_features(s: &Survey) -> [(&'static str, f64); 49] {
    [
        ("gravity", s.gravity),
        ("distanceToArrival", s.distance_to_arrival),
        ("orbitalEccentricity", s.orbital_eccentricity),
        ("orbitalInclination", s.orbital_inclination),
        ("axialTilt", s.axial_tilt),
        ("helium", s.helium),
        ("hydrogen", s.hydrogen),
        ("carbonDioxide", s.carbon_dioxide),
        ("silicates", s.silicates),
        ("sulphurDioxide", s.sulphur_dioxide),
        ("nitrogen", s.nitrogen),
        ("neon", s.neon),
        ("atmosIron", s.atmos_iron),
        ("argon", s.argon),
        ("ammonia", s.ammonia),
        ("methane", s.methane),
        ("water", s.water),
        ("oxygen", s.oxygen),
        ("antimony", s.antimony),
        ("arsenic", s.arsenic),
        ("carbon", s.carbon),
        ("matsIron", s.mats_iron),
        ("nickel", s.nickel),
        ("niobium", s.niobium),
        ("phosphorus", s.phosphorus),
        ("sulphur", s.sulphur),
        ("tin", s.tin),
        ("zinc", s.zinc),
        ("zirconium", s.zirconium),
        ("cadmium", s.cadmium),
        ("manganese", s.manganese),
        ("mercury", s.mercury),
        ("tellurium", s.tellurium),
        ("vanadium", s.vanadium),
        ("chromium", s.chromium),
        ("germanium", s.germanium),
        ("molybdenum", s.molybdenum),
        ("ruthenium", s.ruthenium),
        ("yttrium", s.yttrium),
        ("selenium", s.selenium),
        ("technetium", s.technetium),
        ("tungsten", s.tungsten),
        ("polonium", s.polonium),
        ("rock", s.rock),
        ("ice", s.ice),
        ("metal", s.metal),
        ("count", s.count as f64),
        ("surfaceTemperature", s.surface_temperature),
        ("surfacePressure", s.surface_pressure),
    ]
}

/// Sparse named feature vector for a survey: every numeric column, a
/// `subType=<class>` one-hot indicator, and `genus:<word>` term counts.
/// Categorical names are lowercased.
#[must_use]
pub fn feature_vector(survey: &Survey) -> Vec<(String, f64)> {
    let mut features: Vec<(String, f64)> = numeric_features(survey)
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();

    if !survey.sub_type.is_empty() {
        features.push((format!("subType={}", survey.sub_type.to_lowercase()), 1.0));
    }

    let mut terms: BTreeMap<String, f64> = BTreeMap::new();
    for word in survey.genera.split_whitespace() {
        *terms
            .entry(format!("genus:{}", word.to_lowercase()))
            .or_insert(0.0) += 1.0;
    }
    features.extend(terms);

    features
}

/// Linear scorer loaded from a JSON weight resource:
/// `{ "bias": …, "weights": { "<feature>": … } }`.
///
/// Features absent from the weight table contribute nothing, so the
/// base model is simply one that carries no `genus:` weights.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightModel {
    pub bias: f64,
    pub weights: BTreeMap<String, f64>,
}

impl WeightModel {
    /// Load a model resource. Callers treat failure as fatal at
    /// startup.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CoreError::ModelRead {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CoreError::ModelParse {
            path: path.to_owned(),
            source,
        })
    }
}

impl Predictor for WeightModel {
    #[allow(clippy::cast_possible_truncation)]
    fn predict(&self, survey: &Survey) -> f32 {
        let mut score = self.bias;
        for (name, value) in feature_vector(survey) {
            if let Some(weight) = self.weights.get(&name) {
                score += weight * value;
            }
        }
        score as f32
    }
}
