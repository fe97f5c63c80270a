//! Conversion from journal events to survey records.
//!
//! The survey schema was fixed by the training data, so mapping is an
//! explicit name match rather than anything reflective: every component
//! name the schema knows gets a field, everything else is dropped with a
//! trace. `Iron` is the one name that appears in both atmosphere and
//! material lists and lands in a different field depending on which list
//! it came from.

use surveyor_core::Survey;

use crate::events::{Genus, ScanEvent, Signal};

/// Where a composition entry came from, for the `Iron` disambiguation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Provenance {
    Atmosphere,
    Materials,
}

/// True for a detailed surface scan of a planet.
///
/// Stars and belt clusters have no `PlanetClass`; auto and basic scans
/// carry too little data to survey.
#[must_use]
pub fn is_detailed_planet(scan: &ScanEvent) -> bool {
    !scan.planet_class.is_empty() && scan.scan_type == "Detailed"
}

/// The survey a detailed planet scan contributes, or `None` for scans
/// that carry no survey data.
#[must_use]
pub fn scan_to_survey(scan: &ScanEvent) -> Option<Survey> {
    if !is_detailed_planet(scan) {
        return None;
    }

    let mut survey = Survey {
        sub_type: scan.planet_class.clone(),
        gravity: scan.surface_gravity,
        surface_temperature: scan.surface_temperature,
        surface_pressure: scan.surface_pressure,
        distance_to_arrival: scan.distance_from_arrival_ls,
        orbital_eccentricity: scan.eccentricity,
        orbital_inclination: scan.orbital_inclination,
        axial_tilt: scan.axial_tilt,
        ice: scan.composition.ice,
        rock: scan.composition.rock,
        metal: scan.composition.metal,
        ..Survey::default()
    };

    for part in &scan.atmosphere_composition {
        set_component(&mut survey, &part.name, part.percent, Provenance::Atmosphere);
    }
    for part in &scan.materials {
        set_component(&mut survey, &part.name, part.percent, Provenance::Materials);
    }

    Some(survey)
}

/// Route one composition entry into its survey field.
///
/// Atmosphere names arrive PascalCase and material names lowercase, so
/// matching is on the lowercased name.
fn set_component(survey: &mut Survey, name: &str, percent: f64, provenance: Provenance) {
    match name.to_ascii_lowercase().as_str() {
        "iron" if provenance == Provenance::Atmosphere => survey.atmos_iron = percent,
        "iron" => survey.mats_iron = percent,
        "helium" => survey.helium = percent,
        "hydrogen" => survey.hydrogen = percent,
        "carbondioxide" => survey.carbon_dioxide = percent,
        "silicates" => survey.silicates = percent,
        "sulphurdioxide" => survey.sulphur_dioxide = percent,
        "nitrogen" => survey.nitrogen = percent,
        "neon" => survey.neon = percent,
        "argon" => survey.argon = percent,
        "ammonia" => survey.ammonia = percent,
        "methane" => survey.methane = percent,
        "water" => survey.water = percent,
        "oxygen" => survey.oxygen = percent,
        "antimony" => survey.antimony = percent,
        "arsenic" => survey.arsenic = percent,
        "carbon" => survey.carbon = percent,
        "nickel" => survey.nickel = percent,
        "niobium" => survey.niobium = percent,
        "phosphorus" => survey.phosphorus = percent,
        "sulphur" => survey.sulphur = percent,
        "tin" => survey.tin = percent,
        "zinc" => survey.zinc = percent,
        "zirconium" => survey.zirconium = percent,
        "cadmium" => survey.cadmium = percent,
        "manganese" => survey.manganese = percent,
        "mercury" => survey.mercury = percent,
        "tellurium" => survey.tellurium = percent,
        "vanadium" => survey.vanadium = percent,
        "chromium" => survey.chromium = percent,
        "germanium" => survey.germanium = percent,
        "molybdenum" => survey.molybdenum = percent,
        "ruthenium" => survey.ruthenium = percent,
        "yttrium" => survey.yttrium = percent,
        "selenium" => survey.selenium = percent,
        "technetium" => survey.technetium = percent,
        "tungsten" => survey.tungsten = percent,
        "polonium" => survey.polonium = percent,
        other => tracing::trace!(component = other, "unmapped scan component"),
    }
}

/// Total count across the biological signals in a signal list.
#[must_use]
pub fn biological_count(signals: &[Signal]) -> i64 {
    signals
        .iter()
        .filter(|s| s.is_biological())
        .map(|s| s.count)
        .sum()
}

/// Space-joined distinct genus names, in first-seen order.
#[must_use]
pub fn genera_summary(genuses: &[Genus]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for genus in genuses {
        let name = genus.display_name();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::events::{CompositionPart, SolidComposition};

    use super::*;

    fn detailed_scan() -> ScanEvent {
        ScanEvent {
            scan_type: "Detailed".into(),
            body_name: "Eol Prou SX-W b17-57 B 3".into(),
            star_system: "Eol Prou SX-W b17-57".into(),
            system_address: 125_887_770_477_721,
            planet_class: "Icy body".into(),
            surface_gravity: 1.385_175,
            surface_temperature: 84.272_423,
            surface_pressure: 4935.980_469,
            distance_from_arrival_ls: 1365.954_225,
            atmosphere_composition: vec![CompositionPart {
                name: "Methane".into(),
                percent: 100.0,
            }],
            materials: vec![
                CompositionPart {
                    name: "sulphur".into(),
                    percent: 27.905_174,
                },
                CompositionPart {
                    name: "iron".into(),
                    percent: 12.632_216,
                },
            ],
            composition: SolidComposition {
                ice: 0.681_19,
                rock: 0.220_115,
                metal: 0.098_695,
            },
            ..ScanEvent::default()
        }
    }

    // -- scan_to_survey --

    #[test]
    fn detailed_planet_scan_converts() {
        let survey = scan_to_survey(&detailed_scan()).unwrap();
        assert_eq!(survey.sub_type, "Icy body");
        assert!((survey.gravity - 1.385_175).abs() < 1e-9);
        assert!((survey.distance_to_arrival - 1365.954_225).abs() < 1e-9);
        assert!((survey.methane - 100.0).abs() < 1e-9);
        assert!((survey.sulphur - 27.905_174).abs() < 1e-9);
        assert!((survey.ice - 0.681_19).abs() < 1e-9);
        // No signal data in a scan.
        assert_eq!(survey.count, 0);
        assert!(survey.genera.is_empty());
    }

    #[test]
    fn star_scan_is_not_a_survey() {
        let mut scan = detailed_scan();
        scan.planet_class.clear();
        assert!(scan_to_survey(&scan).is_none());
    }

    #[test]
    fn basic_scan_is_not_a_survey() {
        let mut scan = detailed_scan();
        scan.scan_type = "AutoScan".into();
        assert!(scan_to_survey(&scan).is_none());
    }

    #[test]
    fn iron_maps_by_provenance() {
        let mut scan = detailed_scan();
        scan.atmosphere_composition = vec![CompositionPart {
            name: "Iron".into(),
            percent: 93.5,
        }];
        // Material list already carries lowercase iron at 12.632216.
        let survey = scan_to_survey(&scan).unwrap();
        assert!((survey.atmos_iron - 93.5).abs() < 1e-9);
        assert!((survey.mats_iron - 12.632_216).abs() < 1e-9);
    }

    #[test]
    fn unmapped_component_is_dropped() {
        let mut scan = detailed_scan();
        scan.materials.push(CompositionPart {
            name: "unobtainium".into(),
            percent: 1.0,
        });
        let survey = scan_to_survey(&scan).unwrap();
        // Everything else still lands.
        assert!((survey.sulphur - 27.905_174).abs() < 1e-9);
    }

    // -- signal aggregation --

    #[test]
    fn biological_count_sums_only_biologicals() {
        let signals = vec![
            Signal {
                kind: "$SAA_SignalType_Biological;".into(),
                kind_localised: "Biological".into(),
                count: 3,
            },
            Signal {
                kind: "$SAA_SignalType_Geological;".into(),
                kind_localised: "Geological".into(),
                count: 7,
            },
            Signal {
                kind: "$SAA_SignalType_Biological;".into(),
                kind_localised: "Biological".into(),
                count: 2,
            },
        ];
        assert_eq!(biological_count(&signals), 5);
    }

    #[test]
    fn biological_count_empty_is_zero() {
        assert_eq!(biological_count(&[]), 0);
    }

    #[test]
    fn genera_summary_joins_distinct_names() {
        let genuses = vec![
            Genus {
                genus: "$Codex_Ent_Bacterial_Genus_Name;".into(),
                genus_localised: "Bacterium".into(),
            },
            Genus {
                genus: "$Codex_Ent_Fungoids_Genus_Name;".into(),
                genus_localised: "Fungoida".into(),
            },
            Genus {
                genus: "$Codex_Ent_Bacterial_Genus_Name;".into(),
                genus_localised: "Bacterium".into(),
            },
        ];
        assert_eq!(genera_summary(&genuses), "Bacterium Fungoida");
    }

    #[test]
    fn genera_summary_empty_is_empty() {
        assert!(genera_summary(&[]).is_empty());
    }
}
