//! Server reconciliation for the locally owned entity
//!
//! Compares the newest authoritative snapshot with what was predicted for the
//! same tick. Small differences are accepted as they are. A divergence above
//! the threshold snaps the live state to the server's and replays the inputs
//! buffered since then, after which the reconciliation cooldown suppresses
//! further snaps for a while.

use crate::prediction::PredictionController;
use log::debug;
use shared::{CorrectionState, SnapshotHistory, StateSnapshot, Tick};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// Nothing new, or a cooldown is running.
    Skipped,
    Accepted { divergence: f32 },
    Snapped { divergence: f32, replayed: usize },
}

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    threshold: f32,
    latest: Option<StateSnapshot>,
    last_processed: Option<StateSnapshot>,
}

impl ReconciliationEngine {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latest: None,
            last_processed: None,
        }
    }

    /// Stores the newest authoritative snapshot for the owned entity.
    pub fn receive(&mut self, snapshot: StateSnapshot) {
        self.latest = Some(snapshot);
    }

    pub fn should_reconcile(&self, correction: &CorrectionState) -> bool {
        match self.latest {
            Some(latest) => self.last_processed != Some(latest) && correction.can_reconcile(),
            None => false,
        }
    }

    /// Runs once per tick after prediction.
    ///
    /// With `host` set, the local process also runs the server and the
    /// reference state is the host history one tick before the received
    /// tick. That reference never equals the received snapshot, so a snap in
    /// host mode does not replay.
    pub fn reconcile(
        &mut self,
        prediction: &mut PredictionController,
        correction: &mut CorrectionState,
        current_tick: Tick,
        host: Option<&dyn SnapshotHistory>,
    ) -> ReconcileOutcome {
        if !self.should_reconcile(correction) {
            return ReconcileOutcome::Skipped;
        }
        let Some(latest) = self.latest else {
            return ReconcileOutcome::Skipped;
        };

        let host_history = host.and_then(|host| host.history(latest.entity_id));
        let reference = match host_history {
            Some(history) => {
                if history.slot_index(latest.tick) == 0 {
                    return ReconcileOutcome::Skipped;
                }
                *history.get(latest.tick - 1)
            }
            None => latest,
        };

        let divergence = reference
            .position
            .distance(prediction.predicted(latest.tick).position);

        let outcome = if divergence > self.threshold {
            prediction.set_live(reference.physical_state());
            let replayed = if reference == latest {
                prediction.reseed(&reference);
                prediction.replay(latest.tick, current_tick)
            } else {
                0
            };
            correction.start_reconciliation();
            debug!(
                "Reconciled entity {} at tick {}: divergence {:.3}, replayed {} ticks",
                latest.entity_id, latest.tick, divergence, replayed
            );
            ReconcileOutcome::Snapped { divergence, replayed }
        } else {
            ReconcileOutcome::Accepted { divergence }
        };

        self.last_processed = Some(latest);
        outcome
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn latest(&self) -> Option<&StateSnapshot> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{
        AlwaysOpen, EntityId, MoveCommand, MoveInput, NetcodeConfig, Outbox, PhysicalState, RingBuffer,
        Role, Vec3, World,
    };
    use std::sync::Arc;

    fn setup(ticks: Tick) -> (PredictionController, CorrectionState) {
        let mut prediction = PredictionController::new(
            1,
            Vec3::new(0.0, 1.0, 0.0),
            NetcodeConfig::default(),
            Arc::new(World::default()),
        );
        let correction = CorrectionState::new(1.0, 0.5);
        let (outbox, _rx) = Outbox::channel(Role::Client(1));
        let command = MoveCommand {
            movement: MoveInput::new(1.0, 0.0),
            ..Default::default()
        };
        for tick in 1..=ticks {
            prediction.tick(tick, command, &correction, &AlwaysOpen, 0, &outbox);
        }
        (prediction, correction)
    }

    fn shifted(snapshot: &StateSnapshot, offset: f32) -> StateSnapshot {
        StateSnapshot {
            position: snapshot.position + Vec3::new(offset, 0.0, 0.0),
            ..*snapshot
        }
    }

    #[test]
    fn test_matching_snapshot_is_accepted() {
        let (mut prediction, mut correction) = setup(5);
        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(*prediction.predicted(3));

        let outcome = engine.reconcile(&mut prediction, &mut correction, 5, None);
        assert_eq!(outcome, ReconcileOutcome::Accepted { divergence: 0.0 });
        assert!(!correction.is_reconciling());
    }

    #[test]
    fn test_same_snapshot_is_processed_once() {
        let (mut prediction, mut correction) = setup(5);
        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(*prediction.predicted(3));

        engine.reconcile(&mut prediction, &mut correction, 5, None);
        assert_eq!(
            engine.reconcile(&mut prediction, &mut correction, 5, None),
            ReconcileOutcome::Skipped
        );
    }

    #[test]
    fn test_small_divergence_leaves_state_alone() {
        let (mut prediction, mut correction) = setup(5);
        let before = *prediction.live();
        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(shifted(prediction.predicted(3), 4.0));

        match engine.reconcile(&mut prediction, &mut correction, 5, None) {
            ReconcileOutcome::Accepted { divergence } => assert_approx_eq!(divergence, 4.0, 1e-4),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(*prediction.live(), before);
    }

    #[test]
    fn test_large_divergence_snaps_and_replays() {
        let (mut prediction, mut correction) = setup(5);
        let before = *prediction.live();
        let authoritative = shifted(prediction.predicted(3), 12.0);
        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(authoritative);

        let outcome = engine.reconcile(&mut prediction, &mut correction, 5, None);
        match outcome {
            ReconcileOutcome::Snapped { divergence, replayed } => {
                assert_approx_eq!(divergence, 12.0, 1e-4);
                assert_eq!(replayed, 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(*prediction.predicted(3), authoritative);
        assert_approx_eq!(prediction.live().position.x, before.position.x + 12.0, 1e-4);
        assert_approx_eq!(prediction.live().position.z, before.position.z, 1e-4);
        assert!(correction.is_reconciling());
        assert!(correction.invariant_holds());
    }

    #[test]
    fn test_cooldown_defers_reconciliation() {
        let (mut prediction, mut correction) = setup(5);
        let mut engine = ReconciliationEngine::new(10.0);
        correction.start_reconciliation();
        engine.receive(shifted(prediction.predicted(3), 50.0));

        assert!(!engine.should_reconcile(&correction));
        assert_eq!(
            engine.reconcile(&mut prediction, &mut correction, 5, None),
            ReconcileOutcome::Skipped
        );

        correction.advance(1.5);
        assert!(engine.should_reconcile(&correction));
    }

    #[test]
    fn test_extrapolation_blocks_reconciliation() {
        let (mut prediction, mut correction) = setup(5);
        let mut engine = ReconciliationEngine::new(10.0);
        correction.start_extrapolation();
        engine.receive(shifted(prediction.predicted(3), 50.0));
        assert_eq!(
            engine.reconcile(&mut prediction, &mut correction, 5, None),
            ReconcileOutcome::Skipped
        );
    }

    struct HostHistory {
        entity: EntityId,
        buffer: RingBuffer<StateSnapshot>,
    }

    impl SnapshotHistory for HostHistory {
        fn history(&self, entity: EntityId) -> Option<&RingBuffer<StateSnapshot>> {
            (entity == self.entity).then_some(&self.buffer)
        }
    }

    #[test]
    fn test_host_mode_compares_previous_tick() {
        let (mut prediction, mut correction) = setup(5);
        let mut host = HostHistory {
            entity: 1,
            buffer: RingBuffer::new(1024),
        };
        let far = StateSnapshot::from_state(2, 1, &PhysicalState::at(Vec3::new(40.0, 1.0, 0.0)));
        host.buffer.put(2, far);

        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(*prediction.predicted(3));
        let outcome = engine.reconcile(&mut prediction, &mut correction, 5, Some(&host));

        assert!(matches!(outcome, ReconcileOutcome::Snapped { replayed: 0, .. }));
        assert_eq!(prediction.live().position, Vec3::new(40.0, 1.0, 0.0));
    }

    #[test]
    fn test_host_mode_skips_first_slot() {
        let (mut prediction, mut correction) = setup(5);
        let host = HostHistory {
            entity: 1,
            buffer: RingBuffer::new(1024),
        };
        let mut engine = ReconciliationEngine::new(10.0);
        engine.receive(StateSnapshot {
            tick: 1024,
            ..*prediction.predicted(3)
        });
        assert_eq!(
            engine.reconcile(&mut prediction, &mut correction, 5, Some(&host)),
            ReconcileOutcome::Skipped
        );
    }
}
