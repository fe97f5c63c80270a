//! Focused-system tracking and prediction scoring.
//!
//! The tracker holds the one system the commander is currently in, applies
//! classified journal events to it, and scores bodies as soon as their
//! surveys qualify. The focused system and its dirty flag live behind a
//! `parking_lot::Mutex`; the lock is only ever taken for in-memory work —
//! mutation, snapshotting for persistence, or adopting a persisted result —
//! and never held across a store await.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use surveyor_core::{Predictor, StarSystem, Survey, SystemAddress, UNFOCUSED, UNKNOWN_NAME};
use surveyor_journal::{biological_count, genera_summary, scan_to_survey, JournalEvent};
use surveyor_store::SystemStore;
use surveyor_tasks::RateLimiter;

use crate::errors::Result;

/// Minimum spacing between status summaries.
const STATUS_PERIOD: Duration = Duration::from_secs(1);

/// A name worth adopting: non-empty and not the unknown placeholder.
fn usable_name(hint: Option<&str>) -> Option<&str> {
    hint.filter(|h| !h.is_empty() && *h != UNKNOWN_NAME)
}

struct Focus {
    system: StarSystem,
    dirty: bool,
}

/// Tracks the focused system and keeps it scored and persisted.
pub struct SystemTracker {
    store: Arc<dyn SystemStore>,
    base: Box<dyn Predictor>,
    refined: Box<dyn Predictor>,
    focus: Mutex<Focus>,
    status_limiter: RateLimiter,
}

impl SystemTracker {
    pub fn new(
        store: Arc<dyn SystemStore>,
        base: Box<dyn Predictor>,
        refined: Box<dyn Predictor>,
    ) -> Self {
        Self {
            store,
            base,
            refined,
            focus: Mutex::new(Focus {
                system: StarSystem::with_address(UNFOCUSED),
                dirty: false,
            }),
            status_limiter: RateLimiter::new(STATUS_PERIOD),
        }
    }

    /// Route one classified event into the tracker.
    pub async fn apply(&self, event: JournalEvent) -> Result<()> {
        match event {
            JournalEvent::FsdJump(e) => {
                info!(system = %e.star_system, address = e.system_address, "jumping");
                self.encounter_system(e.system_address, Some(&e.star_system))
                    .await
            }
            JournalEvent::Location(e) => {
                trace!(system = %e.star_system, address = e.system_address, "location received");
                self.encounter_system(e.system_address, Some(&e.star_system))
                    .await
            }
            JournalEvent::Scan(e) => {
                debug!(body = %e.body_name, "scan received");
                self.encounter_system(e.system_address, Some(&e.star_system))
                    .await?;
                match scan_to_survey(&e) {
                    Some(survey) => {
                        self.encounter_body_data(e.system_address, &e.body_name, survey)
                            .await
                    }
                    None => {
                        trace!(body = %e.body_name, "not a detailed planet scan; skipped");
                        Ok(())
                    }
                }
            }
            JournalEvent::FssBodySignals(e) => {
                debug!(body = %e.body_name, "fss body signals received");
                let survey = Survey {
                    count: biological_count(&e.signals),
                    ..Survey::default()
                };
                self.encounter_body_data(e.system_address, &e.body_name, survey)
                    .await
            }
            JournalEvent::SaaSignalsFound(e) => {
                debug!(body = %e.body_name, "saa signals received");
                let survey = Survey {
                    count: biological_count(&e.signals),
                    genera: genera_summary(&e.genuses),
                    ..Survey::default()
                };
                self.encounter_body_data(e.system_address, &e.body_name, survey)
                    .await
            }
            JournalEvent::Status(_) => self.status_summary().await,
        }
    }

    /// Make `address` the focused system.
    ///
    /// Already focused: backfill an unknown name from the hint and return.
    /// Otherwise persist the outgoing focus if it has unsaved changes, then
    /// load (or seed) the new system from the store and adopt it clean.
    pub async fn encounter_system(
        &self,
        address: SystemAddress,
        name_hint: Option<&str>,
    ) -> Result<()> {
        trace!(address, "encountering system");
        let outgoing = {
            let mut focus = self.focus.lock();
            if focus.system.address == address {
                if focus.system.name_is_unknown() {
                    if let Some(hint) = usable_name(name_hint) {
                        focus.system.name = Some(hint.to_owned());
                        focus.dirty = true;
                    }
                }
                return Ok(());
            }
            focus.dirty.then(|| focus.system.clone())
        };

        if let Some(outgoing) = outgoing {
            debug!(system = %outgoing, "persisting departed system");
            self.store.merge_upsert(outgoing).await?;
        }

        let incoming = self.store.get(address, name_hint).await?;
        debug!(system = %incoming, "focused system");
        let mut focus = self.focus.lock();
        focus.system = incoming;
        focus.dirty = false;
        Ok(())
    }

    /// Merge a survey into the named body of the system at `address`.
    ///
    /// A body seen for the first time is persisted eagerly so it survives
    /// an abrupt exit; updates to a known body just mark the focus dirty.
    /// Either way the readiness scan runs afterwards.
    pub async fn encounter_body_data(
        &self,
        address: SystemAddress,
        body_name: &str,
        survey: Survey,
    ) -> Result<()> {
        trace!(address, body = body_name, "encountering body data");
        self.encounter_system(address, None).await?;

        let eager = {
            let mut focus = self.focus.lock();
            let existed = focus.system.update_body(body_name, survey);
            if existed {
                focus.dirty = true;
                None
            } else {
                Some(focus.system.clone())
            }
        };
        if let Some(snapshot) = eager {
            let merged = self.store.merge_upsert(snapshot).await?;
            let mut focus = self.focus.lock();
            focus.system = merged;
            focus.dirty = false;
        }

        self.scan_and_score().await
    }

    /// Score every ready body whose slot is still empty, then persist if
    /// anything changed. Slots are write-once, so replays are harmless.
    async fn scan_and_score(&self) -> Result<()> {
        let snapshot = {
            let mut focus = self.focus.lock();
            let mut changed = false;

            let base_scores: Vec<(String, f32)> = focus
                .system
                .prediction_ready_bodies()
                .map(|(name, body)| (name.clone(), self.base.predict(&body.survey)))
                .collect();
            for (name, score) in base_scores {
                if focus.system.update_prediction(&name, score) {
                    info!(body = %name, score, "base prediction recorded");
                    changed = true;
                }
            }

            let refined_scores: Vec<(String, f32)> = focus
                .system
                .refined_ready_bodies()
                .map(|(name, body)| (name.clone(), self.refined.predict(&body.survey)))
                .collect();
            for (name, score) in refined_scores {
                if focus.system.update_refined_prediction(&name, score) {
                    info!(body = %name, score, "refined prediction recorded");
                    changed = true;
                }
            }

            changed.then(|| focus.system.clone())
        };

        if let Some(snapshot) = snapshot {
            let merged = self.store.merge_upsert(snapshot).await?;
            let mut focus = self.focus.lock();
            focus.system = merged;
            focus.dirty = false;
        }
        Ok(())
    }

    /// Rescan and log a one-line picture of the focused system. Rate
    /// limited, since status events arrive far faster than a human reads.
    async fn status_summary(&self) -> Result<()> {
        trace!("status received");
        if !self.status_limiter.try_take() {
            return Ok(());
        }

        self.scan_and_score().await?;
        let focus = self.focus.lock();
        let system = &focus.system;
        info!(system = %system, bodies = system.bodies.len(), "tracking");
        let eligible = system
            .bodies
            .values()
            .filter(|body| body.prediction_ready())
            .count();
        if eligible > 0 {
            info!(eligible, "bodies eligible for scoring");
        }
        info!(
            predictions = ?system.predictions(),
            refined = ?system.refined_predictions(),
            "current predictions"
        );
        Ok(())
    }

    /// Persist the focused system if it has unsaved changes.
    pub async fn flush(&self) -> Result<()> {
        let snapshot = {
            let focus = self.focus.lock();
            focus.dirty.then(|| focus.system.clone())
        };
        if let Some(snapshot) = snapshot {
            debug!(system = %snapshot, "flushing focused system");
            let merged = self.store.merge_upsert(snapshot).await?;
            let mut focus = self.focus.lock();
            focus.system = merged;
            focus.dirty = false;
        }
        Ok(())
    }

    /// Snapshot of the focused system, for observers.
    #[must_use]
    pub fn focused(&self) -> StarSystem {
        self.focus.lock().system.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
