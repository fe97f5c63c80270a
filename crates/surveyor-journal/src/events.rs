//! Typed journal events and line classification.
//!
//! Journal files are JSON lines tagged by an `"event"` field, e.g.
//!
//! ```text
//! { "timestamp":"2023-02-20T05:11:07Z", "event":"FSSBodySignals",
//!   "BodyName":"Eol Prou SX-W b17-57 B 3", "BodyID":28,
//!   "SystemAddress":125887770477721,
//!   "Signals":[ { "Type":"$SAA_SignalType_Biological;",
//!                 "Type_Localised":"Biological", "Count":1 } ] }
//! ```
//!
//! [`classify`] routes a line to one of the six kinds the monitor consumes
//! by case-insensitive prefix match on the kind name, skips everything
//! else, and refuses to guess when a prefix matches more than one kind.
//! Field defaults double as "absent" so partial lines still parse.

use serde::Deserialize;

use crate::errors::{JournalError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Event payloads
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of `AtmosphereComposition` or `Materials`.
///
/// Atmosphere names arrive PascalCase (`"CarbonDioxide"`), material names
/// lowercase (`"iron"`).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompositionPart {
    pub name: String,
    pub percent: f64,
}

/// Solid-body composition fractions from a `Scan`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SolidComposition {
    pub ice: f64,
    pub rock: f64,
    pub metal: f64,
}

/// A surface-signal entry from `FSSBodySignals` or `SAASignalsFound`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Signal {
    /// Raw signal type symbol, e.g. `"$SAA_SignalType_Biological;"`.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Localized signal type, e.g. `"Biological"`.
    #[serde(rename = "Type_Localised")]
    pub kind_localised: String,
    #[serde(rename = "Count")]
    pub count: i64,
}

impl Signal {
    /// True for biological surface signals.
    ///
    /// Checks the localized name first and falls back to the raw symbol,
    /// which still carries the `Biological` tag when localization is
    /// missing.
    #[must_use]
    pub fn is_biological(&self) -> bool {
        self.kind_localised == "Biological" || self.kind.contains("Bio")
    }
}

/// A genus entry from `SAASignalsFound`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Genus {
    /// Raw genus symbol, e.g. `"$Codex_Ent_Bacterial_Genus_Name;"`.
    #[serde(rename = "Genus")]
    pub genus: String,
    /// Localized genus name, e.g. `"Bacterium"`.
    #[serde(rename = "Genus_Localised")]
    pub genus_localised: String,
}

impl Genus {
    /// The localized name, or the raw symbol when localization is missing.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.genus_localised.is_empty() {
            &self.genus
        } else {
            &self.genus_localised
        }
    }
}

/// A `Scan` event: one body's detailed (or basic) scan results.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScanEvent {
    pub scan_type: String,
    pub body_name: String,
    #[serde(rename = "BodyID")]
    pub body_id: i64,
    pub star_system: String,
    pub system_address: u64,
    /// Empty for stars and belt clusters.
    pub planet_class: String,
    pub surface_gravity: f64,
    pub surface_temperature: f64,
    pub surface_pressure: f64,
    #[serde(rename = "DistanceFromArrivalLS")]
    pub distance_from_arrival_ls: f64,
    pub eccentricity: f64,
    pub orbital_inclination: f64,
    pub axial_tilt: f64,
    pub atmosphere_composition: Vec<CompositionPart>,
    pub materials: Vec<CompositionPart>,
    pub composition: SolidComposition,
}

/// An `FSSBodySignals` event: signal counts found by the system scanner.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FssBodySignalsEvent {
    pub body_name: String,
    #[serde(rename = "BodyID")]
    pub body_id: i64,
    pub system_address: u64,
    pub signals: Vec<Signal>,
}

/// An `SAASignalsFound` event: signals plus genera from a surface mapper.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SaaSignalsFoundEvent {
    pub body_name: String,
    #[serde(rename = "BodyID")]
    pub body_id: i64,
    pub system_address: u64,
    pub signals: Vec<Signal>,
    pub genuses: Vec<Genus>,
}

/// A `Location` event: where the commander currently is.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationEvent {
    pub star_system: String,
    pub system_address: u64,
}

/// An `FSDJump` event: arrival in a new system.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FsdJumpEvent {
    pub star_system: String,
    pub system_address: u64,
}

/// A `Status` heartbeat. Carries no fields the monitor reads; its arrival
/// alone drives the rate-limited summary.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct StatusEvent {}

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// The six journal event kinds the monitor consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Scan,
    FssBodySignals,
    SaaSignalsFound,
    Location,
    FsdJump,
    Status,
}

impl EventKind {
    /// Every kind, in classification order.
    pub const ALL: [EventKind; 6] = [
        EventKind::Scan,
        EventKind::FssBodySignals,
        EventKind::SaaSignalsFound,
        EventKind::Location,
        EventKind::FsdJump,
        EventKind::Status,
    ];

    /// The journal's name for this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Scan => "Scan",
            EventKind::FssBodySignals => "FSSBodySignals",
            EventKind::SaaSignalsFound => "SAASignalsFound",
            EventKind::Location => "Location",
            EventKind::FsdJump => "FSDJump",
            EventKind::Status => "Status",
        }
    }

    /// True when `event` is a case-insensitive prefix of this kind's name.
    fn matches(self, event: &str) -> bool {
        self.name()
            .get(..event.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(event))
    }

    /// Deserialize a full line into this kind's payload.
    fn parse(self, line: &str) -> serde_json::Result<JournalEvent> {
        Ok(match self {
            EventKind::Scan => JournalEvent::Scan(serde_json::from_str(line)?),
            EventKind::FssBodySignals => JournalEvent::FssBodySignals(serde_json::from_str(line)?),
            EventKind::SaaSignalsFound => {
                JournalEvent::SaaSignalsFound(serde_json::from_str(line)?)
            }
            EventKind::Location => JournalEvent::Location(serde_json::from_str(line)?),
            EventKind::FsdJump => JournalEvent::FsdJump(serde_json::from_str(line)?),
            EventKind::Status => JournalEvent::Status(serde_json::from_str(line)?),
        })
    }
}

/// A classified journal event, ready for dispatch.
#[derive(Clone, Debug)]
pub enum JournalEvent {
    Scan(ScanEvent),
    FssBodySignals(FssBodySignalsEvent),
    SaaSignalsFound(SaaSignalsFoundEvent),
    Location(LocationEvent),
    FsdJump(FsdJumpEvent),
    Status(StatusEvent),
}

impl JournalEvent {
    /// Which kind this event is.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            JournalEvent::Scan(_) => EventKind::Scan,
            JournalEvent::FssBodySignals(_) => EventKind::FssBodySignals,
            JournalEvent::SaaSignalsFound(_) => EventKind::SaaSignalsFound,
            JournalEvent::Location(_) => EventKind::Location,
            JournalEvent::FsdJump(_) => EventKind::FsdJump,
            JournalEvent::Status(_) => EventKind::Status,
        }
    }
}

/// Envelope read to classify a line without parsing the full payload.
#[derive(Deserialize)]
struct Envelope {
    event: Option<String>,
}

/// Classify one journal line.
///
/// Returns `Ok(None)` for blank lines, lines that are not JSON objects
/// (journals truncated mid-write leave those behind), events no kind
/// matches, and lines whose payload fails to parse as the matched kind.
/// Returns [`JournalError::AmbiguousLine`] when more than one kind
/// matches — the caller must halt rather than dispatch a guess.
pub fn classify(line: &str) -> Result<Option<JournalEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Ok(envelope) = serde_json::from_str::<Envelope>(line) else {
        tracing::debug!(line, "skipping unparseable journal line");
        return Ok(None);
    };
    let Some(event) = envelope.event else {
        return Ok(None);
    };

    let mut matched: Option<EventKind> = None;
    let mut count = 0usize;
    for kind in EventKind::ALL {
        if kind.matches(&event) {
            matched = Some(kind);
            count += 1;
        }
    }

    match (matched, count) {
        (None, _) => Ok(None),
        (Some(kind), 1) => match kind.parse(line) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                tracing::debug!(event, error = %e, "skipping journal line that failed to parse");
                Ok(None)
            }
        },
        (Some(_), count) => Err(JournalError::AmbiguousLine { event, count }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
