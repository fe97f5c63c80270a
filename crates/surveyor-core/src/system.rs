//! Star system aggregate: an address-keyed root holding named bodies.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::survey::Survey;

/// Stable journal address of a star system.
pub type SystemAddress = u64;

/// Address sentinel meaning "not currently in any system".
pub const UNFOCUSED: SystemAddress = 0;

/// Display stand-in for systems whose name has not been observed yet.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A named body: its survey plus two write-once prediction slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    pub survey: Survey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_prediction: Option<f32>,
}

impl Body {
    /// Left-biased merge. Prediction slots keep the first value ever
    /// set, regardless of which side carries it.
    #[must_use]
    pub fn merge(self, other: Body) -> Body {
        Body {
            survey: self.survey.merge(other.survey),
            prediction: self.prediction.or(other.prediction),
            refined_prediction: self.refined_prediction.or(other.refined_prediction),
        }
    }

    #[must_use]
    pub fn prediction_ready(&self) -> bool {
        self.survey.prediction_ready()
    }

    #[must_use]
    pub fn refined_prediction_ready(&self) -> bool {
        self.survey.refined_prediction_ready()
    }
}

/// Everything observed so far about one star system.
///
/// `address` is immutable once assigned. `name` only ever moves from
/// unknown to known; `None`, the empty string, and the literal
/// `"Unknown"` all read as unknown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarSystem {
    pub address: SystemAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bodies: BTreeMap<String, Body>,
}

impl StarSystem {
    pub fn new(address: SystemAddress, name: Option<&str>) -> Self {
        Self {
            address,
            name: name.map(str::to_owned),
            bodies: BTreeMap::new(),
        }
    }

    /// A system known only by its address.
    pub fn with_address(address: SystemAddress) -> Self {
        Self::new(address, None)
    }

    /// The resolved name, if one has been observed.
    #[must_use]
    pub fn known_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty() && *name != UNKNOWN_NAME)
    }

    #[must_use]
    pub fn name_is_unknown(&self) -> bool {
        self.known_name().is_none()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.known_name().unwrap_or(UNKNOWN_NAME)
    }

    /// Ensure a body exists under `name`. Returns whether it was
    /// already present.
    pub fn encounter_body(&mut self, name: &str) -> bool {
        match self.bodies.entry(name.to_owned()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(Body::default());
                false
            }
        }
    }

    /// Merge a survey into the named body, creating it if new. Returns
    /// whether the body was already present.
    pub fn update_body(&mut self, name: &str, survey: Survey) -> bool {
        match self.bodies.entry(name.to_owned()) {
            Entry::Occupied(mut existing) => {
                let body = existing.get_mut();
                body.survey = std::mem::take(&mut body.survey).merge(survey);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(Body {
                    survey,
                    ..Body::default()
                });
                false
            }
        }
    }

    /// Fill the base prediction slot. First writer wins; returns
    /// whether the slot was newly filled.
    pub fn update_prediction(&mut self, name: &str, score: f32) -> bool {
        let body = self.bodies.entry(name.to_owned()).or_default();
        if body.prediction.is_some() {
            return false;
        }
        body.prediction = Some(score);
        true
    }

    /// Fill the refined prediction slot. First writer wins; returns
    /// whether the slot was newly filled.
    pub fn update_refined_prediction(&mut self, name: &str, score: f32) -> bool {
        let body = self.bodies.entry(name.to_owned()).or_default();
        if body.refined_prediction.is_some() {
            return false;
        }
        body.refined_prediction = Some(score);
        true
    }

    /// The only deletion path; returns whether the body existed.
    pub fn remove_body(&mut self, name: &str) -> bool {
        self.bodies.remove(name).is_some()
    }

    /// Bodies eligible for base scoring whose slot is still empty.
    pub fn prediction_ready_bodies(&self) -> impl Iterator<Item = (&String, &Body)> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.prediction_ready() && body.prediction.is_none())
    }

    /// Bodies eligible for refined scoring whose slot is still empty.
    pub fn refined_ready_bodies(&self) -> impl Iterator<Item = (&String, &Body)> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.refined_prediction_ready() && body.refined_prediction.is_none())
    }

    /// Recorded base scores by body name.
    #[must_use]
    pub fn predictions(&self) -> BTreeMap<&str, f32> {
        self.bodies
            .iter()
            .filter_map(|(name, body)| body.prediction.map(|score| (name.as_str(), score)))
            .collect()
    }

    /// Recorded refined scores by body name.
    #[must_use]
    pub fn refined_predictions(&self) -> BTreeMap<&str, f32> {
        self.bodies
            .iter()
            .filter_map(|(name, body)| body.refined_prediction.map(|score| (name.as_str(), score)))
            .collect()
    }

    /// Merge two records of the same system: a known name on either
    /// side wins (left preferred), bodies are a key union with per-key
    /// left-biased merges.
    ///
    /// Callers only merge records stored under the same key, so
    /// `self.address` is kept.
    #[must_use]
    pub fn merge(mut self, other: StarSystem) -> StarSystem {
        if self.name_is_unknown() {
            if let Some(name) = other.known_name() {
                self.name = Some(name.to_owned());
            }
        }
        for (name, body) in other.bodies {
            match self.bodies.entry(name) {
                Entry::Occupied(mut existing) => {
                    let merged = existing.get().clone().merge(body);
                    existing.insert(merged);
                }
                Entry::Vacant(slot) => {
                    slot.insert(body);
                }
            }
        }
        self
    }
}

impl fmt::Display for StarSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(sub_type: &str, count: i64) -> Survey {
        Survey {
            sub_type: sub_type.to_owned(),
            count,
            ..Survey::default()
        }
    }

    #[test]
    fn unknown_name_variants() {
        assert!(StarSystem::with_address(1).name_is_unknown());
        assert!(StarSystem::new(1, Some("")).name_is_unknown());
        assert!(StarSystem::new(1, Some("Unknown")).name_is_unknown());
        assert_eq!(StarSystem::with_address(1).display_name(), "Unknown");

        let named = StarSystem::new(1, Some("Sol"));
        assert_eq!(named.known_name(), Some("Sol"));
        assert_eq!(named.to_string(), "Sol (1)");
    }

    #[test]
    fn encounter_body_reports_prior_presence() {
        let mut system = StarSystem::with_address(42);
        assert!(!system.encounter_body("6 a"));
        assert!(system.encounter_body("6 a"));
    }

    #[test]
    fn update_body_merges_into_existing() {
        let mut system = StarSystem::with_address(42);
        assert!(!system.update_body("6 a", survey("Icy body", 0)));
        assert!(system.update_body("6 a", survey("", 3)));

        let body = &system.bodies["6 a"];
        assert_eq!(body.survey.sub_type, "Icy body");
        assert_eq!(body.survey.count, 3);
    }

    #[test]
    fn prediction_slots_are_write_once() {
        let mut system = StarSystem::with_address(42);
        assert!(system.update_prediction("6 a", 1.5));
        assert!(!system.update_prediction("6 a", 9.9));
        assert_eq!(system.bodies["6 a"].prediction, Some(1.5));

        assert!(system.update_refined_prediction("6 a", 2.5));
        assert!(!system.update_refined_prediction("6 a", 7.7));
        assert_eq!(system.bodies["6 a"].refined_prediction, Some(2.5));
    }

    #[test]
    fn merge_does_not_overwrite_prediction() {
        let mut a = StarSystem::with_address(42);
        a.update_prediction("6 a", 1.5);

        let mut b = StarSystem::with_address(42);
        b.update_prediction("6 a", 9.9);
        b.update_refined_prediction("6 a", 3.0);

        let merged = a.merge(b);
        let body = &merged.bodies["6 a"];
        assert_eq!(body.prediction, Some(1.5));
        assert_eq!(body.refined_prediction, Some(3.0));
    }

    #[test]
    fn merge_unions_bodies_and_resolves_name() {
        let mut a = StarSystem::with_address(42);
        a.update_body("1", survey("Rocky body", 0));

        let mut b = StarSystem::new(42, Some("Synuefe EN-H d11-106"));
        b.update_body("1", survey("", 2));
        b.update_body("7 a", survey("Icy body", 1));

        let merged = a.merge(b);
        assert_eq!(merged.known_name(), Some("Synuefe EN-H d11-106"));
        assert_eq!(merged.bodies.len(), 2);
        assert_eq!(merged.bodies["1"].survey.sub_type, "Rocky body");
        assert_eq!(merged.bodies["1"].survey.count, 2);
        assert_eq!(merged.bodies["7 a"].survey.count, 1);
    }

    #[test]
    fn merge_prefers_left_known_name() {
        let a = StarSystem::new(42, Some("Sol"));
        let b = StarSystem::new(42, Some("Barnard's Star"));
        assert_eq!(a.merge(b).known_name(), Some("Sol"));
    }

    #[test]
    fn readiness_scan_skips_filled_slots() {
        let mut system = StarSystem::with_address(42);
        system.update_body("6 a", survey("Icy body", 3));
        system.update_body("6 b", survey("Icy body", 1));
        system.update_prediction("6 b", 4.0);

        let ready: Vec<_> = system
            .prediction_ready_bodies()
            .map(|(name, _)| name.clone())
            .collect();
        assert_eq!(ready, vec!["6 a".to_owned()]);
        assert_eq!(system.refined_ready_bodies().count(), 0);
    }

    #[test]
    fn remove_body_is_the_only_deletion() {
        let mut system = StarSystem::with_address(42);
        system.update_body("6 a", survey("Icy body", 3));
        assert!(system.remove_body("6 a"));
        assert!(!system.remove_body("6 a"));
        assert!(system.bodies.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let mut system = StarSystem::new(42, Some("Sol"));
        system.update_body("6 a", survey("Icy body", 3));
        system.update_prediction("6 a", 1.25);

        let json = serde_json::to_value(&system).unwrap();
        assert_eq!(json["address"], 42);
        assert_eq!(json["name"], "Sol");
        assert_eq!(json["bodies"]["6 a"]["survey"]["subType"], "Icy body");
        assert_eq!(json["bodies"]["6 a"]["prediction"], 1.25);
        assert!(json["bodies"]["6 a"].get("refinedPrediction").is_none());
    }

    #[test]
    fn prediction_views() {
        let mut system = StarSystem::with_address(42);
        system.update_prediction("6 a", 1.0);
        system.update_refined_prediction("6 a", 2.0);
        system.update_prediction("6 b", 3.0);

        assert_eq!(system.predictions().len(), 2);
        assert_eq!(system.refined_predictions().len(), 1);
        assert_eq!(system.predictions()["6 a"], 1.0);
    }
}
