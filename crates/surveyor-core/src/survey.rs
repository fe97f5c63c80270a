//! Sparse survey record for a scanned body and its merge rules.
//!
//! Observations arrive piecemeal across many journal events, so every
//! field carries a "not yet observed" sentinel (`0`/`0.0` for numerics,
//! `""` for strings) and merging is a deterministic left-biased fold:
//! the first non-default value wins and is never replaced. This is not a
//! CRDT — merge order matters when two sides disagree on a present
//! field — but it is idempotent, which is what makes replaying duplicate
//! or out-of-order journal lines safe.

use serde::{Deserialize, Serialize};

/// First-non-absent-wins helper for sentinel-typed fields.
pub(crate) trait OrAbsent: Sized {
    fn is_absent(&self) -> bool;

    /// `self` when present, otherwise `fallback`.
    fn or_absent(self, fallback: Self) -> Self {
        if self.is_absent() {
            fallback
        } else {
            self
        }
    }
}

impl OrAbsent for f64 {
    fn is_absent(&self) -> bool {
        *self == 0.0
    }
}

impl OrAbsent for i64 {
    fn is_absent(&self) -> bool {
        *self == 0
    }
}

impl OrAbsent for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T> OrAbsent for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

/// Declares the survey record from a single field list.
///
/// Emits the struct, the left-biased per-field merge, and the
/// all-absent check. Because the merge constructs the struct
/// exhaustively, a field added to the list gets a merge rule for free
/// and a field added anywhere else fails to compile — the field
/// inventory and the merge rules cannot drift apart, and a field can
/// only ever merge against itself on the other side.
macro_rules! survey_record {
    ($($field:ident: $ty:ty),* $(,)?) => {
        /// Sparse measurements collected so far about a single body.
        ///
        /// A field equal to its default is "not yet observed". There is
        /// no separate presence bit, so a measured zero is
        /// indistinguishable from a missing measurement; merges treat
        /// the two identically. Serialized as camelCase JSON with absent
        /// fields omitted.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct Survey {
            $(
                #[serde(skip_serializing_if = "OrAbsent::is_absent")]
                pub $field: $ty,
            )*
        }

        impl Survey {
            /// Left-biased merge: each field keeps `self`'s value when
            /// present and falls back to `other`'s otherwise.
            ///
            /// `merge(a, a) == a`, and `merge(a, b) == a` whenever `a`
            /// is fully populated.
            #[must_use]
            pub fn merge(self, other: Survey) -> Survey {
                Survey {
                    $($field: self.$field.or_absent(other.$field),)*
                }
            }

            /// True when every field is still at its absent sentinel.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                $(self.$field.is_absent())&&*
            }
        }
    };
}

survey_record! {
    sub_type: String,
    gravity: f64,
    distance_to_arrival: f64,
    orbital_eccentricity: f64,
    orbital_inclination: f64,
    axial_tilt: f64,
    helium: f64,
    hydrogen: f64,
    carbon_dioxide: f64,
    silicates: f64,
    sulphur_dioxide: f64,
    nitrogen: f64,
    neon: f64,
    atmos_iron: f64,
    argon: f64,
    ammonia: f64,
    methane: f64,
    water: f64,
    oxygen: f64,
    antimony: f64,
    arsenic: f64,
    carbon: f64,
    mats_iron: f64,
    nickel: f64,
    niobium: f64,
    phosphorus: f64,
    sulphur: f64,
    tin: f64,
    zinc: f64,
    zirconium: f64,
    cadmium: f64,
    manganese: f64,
    mercury: f64,
    tellurium: f64,
    vanadium: f64,
    chromium: f64,
    germanium: f64,
    molybdenum: f64,
    ruthenium: f64,
    yttrium: f64,
    selenium: f64,
    technetium: f64,
    tungsten: f64,
    polonium: f64,
    rock: f64,
    ice: f64,
    metal: f64,
    count: i64,
    surface_temperature: f64,
    surface_pressure: f64,
    genera: String,
    value: i64,
}

impl Survey {
    /// A body can be scored once it has a biological signal count and a
    /// classified sub-type.
    #[must_use]
    pub fn prediction_ready(&self) -> bool {
        self.count != 0 && !self.sub_type.is_empty()
    }

    /// Refined scoring additionally needs the observed genera.
    #[must_use]
    pub fn refined_prediction_ready(&self) -> bool {
        self.prediction_ready() && !self.genera.is_empty()
    }
}
