//! The client-side prediction context for the locally controlled entity.

use std::sync::Arc;

use skirmish_sim::ability::AbilitySlot;
use skirmish_sim::catalog::activation_allowed;
use skirmish_sim::cooldown::Role;
use skirmish_sim::input::{ActionFlags, Input};
use skirmish_sim::intent::Emissions;
use skirmish_sim::kit::Loadout;
use skirmish_sim::locomotion::LocomotionState;
use skirmish_sim::math::Vec2;
use skirmish_sim::state::EntityState;
use skirmish_sim::stats::{StatKind, StatLedger};
use skirmish_sim::step::{simulate_tick, AbilityContext};
use tracing::{debug, trace};

use crate::collab::CueSink;
use crate::config::NetConfig;
use crate::history::PredictionHistory;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::registry::EntityId;
use crate::snapshot::AuthoritativeSnapshot;

/// Result of one predicted tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTick {
    /// The input as recorded; this is what must be sent to the authority.
    pub input: Input,
    /// Side effects and cues for local presentation.
    pub emissions: Emissions,
}

/// Runs the owning client's entity ahead of confirmation.
#[derive(Debug, Clone)]
pub struct ClientSimulation {
    entity: EntityId,
    loadout: Arc<Loadout>,
    state: EntityState,
    current_tick: u64,
    history: PredictionHistory,
    reconciler: Reconciler,
    pending: ActionFlags,
    rolling_back: bool,
}

impl ClientSimulation {
    pub fn new(entity: EntityId, loadout: Arc<Loadout>, spawn: Vec2, config: &NetConfig) -> Self {
        let state = EntityState::spawn(spawn, &loadout);
        Self {
            entity,
            loadout,
            state,
            current_tick: 0,
            history: PredictionHistory::new(),
            reconciler: Reconciler::from_config(config),
            pending: ActionFlags::default(),
            rolling_back: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The next tick to be predicted.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn locomotion(&self) -> LocomotionState {
        self.state.locomotion
    }

    /// Always true on the client: every state it holds is a prediction.
    pub fn is_predicting(&self) -> bool {
        true
    }

    /// True from a correction until the next predicted tick: the current
    /// state was rewritten from an authoritative snapshot rather than
    /// predicted forward. Cues recomputed during that replay are reported
    /// through [`CueSink::on_replayed_cue`] by
    /// [`apply_snapshot_with`](Self::apply_snapshot_with).
    pub fn is_rolling_back(&self) -> bool {
        self.rolling_back
    }

    pub fn history(&self) -> &PredictionHistory {
        &self.history
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Current multiplier for `kind` (1.0 when unmodified), for HUD display.
    pub fn get_stat(&self, kind: StatKind) -> f64 {
        StatLedger::from_snapshot(&self.state.stats).get_stat(kind, 1.0)
    }

    /// Request `slot` for the next tick.
    ///
    /// Returns whether the gates pass right now. An accepted request is
    /// latched into the next [`tick`](Self::tick) input; the step still has
    /// the final say.
    pub fn try_activate_ability(&mut self, slot: AbilitySlot) -> bool {
        let ctx = AbilityContext::new(self.current_tick, Role::Predicting, &self.loadout);
        if !activation_allowed(&self.state, slot, &ctx) {
            debug!(entity = %self.entity, tick = self.current_tick, ?slot, "activation request refused");
            return false;
        }
        self.pending.press(slot);
        true
    }

    /// Predict one tick with `input`.
    ///
    /// The input is stamped with the current tick and merged with any
    /// latched ability requests. Before recording, a flag is kept only if
    /// its slot activated this tick or was driving the entity before or
    /// after it. Every other flag was refused without effect, and clearing
    /// it keeps the authority's one-tick cooldown slack from accepting what
    /// the client turned down.
    pub fn tick(&mut self, input: Input) -> ClientTick {
        let tick = self.current_tick;
        let mut input = input.retick(tick);
        for slot in AbilitySlot::ALL {
            if self.pending.pressed(slot) {
                input.actions.press(slot);
            }
        }
        self.pending = ActionFlags::default();

        let ctx = AbilityContext::new(tick, Role::Predicting, &self.loadout);
        let out = simulate_tick(&self.state, &input, &ctx);
        let driving = |state: &EntityState, slot| state.activity.is_some_and(|a| a.slot == slot);
        input.actions.retain(|slot| {
            out.emissions.cues.iter().any(|cue| cue.slot == slot)
                || driving(&self.state, slot)
                || driving(&out.state, slot)
        });

        self.state = out.state;
        self.history.record(tick, input, self.state);
        self.current_tick += 1;
        self.rolling_back = false;
        trace!(entity = %self.entity, tick, x = self.state.position.x, y = self.state.position.y, "predicted");

        ClientTick {
            input,
            emissions: out.emissions,
        }
    }

    /// Reconcile with a snapshot from the authority.
    pub fn apply_snapshot(&mut self, snapshot: &AuthoritativeSnapshot) -> ReconcileOutcome {
        self.reconcile(snapshot, &mut |_, _| {})
    }

    /// [`apply_snapshot`](Self::apply_snapshot), reporting the cues of
    /// replayed ticks to `cues` as replays.
    pub fn apply_snapshot_with(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        cues: &mut dyn CueSink,
    ) -> ReconcileOutcome {
        let entity = self.entity;
        self.reconcile(snapshot, &mut |_, emissions| {
            for cue in &emissions.cues {
                cues.on_replayed_cue(entity, cue);
            }
        })
    }

    fn reconcile(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        on_replayed: &mut dyn FnMut(u64, &Emissions),
    ) -> ReconcileOutcome {
        let outcome = self.reconciler.reconcile_with(
            snapshot,
            &mut self.history,
            self.current_tick,
            &self.loadout,
            on_replayed,
        );
        if outcome.corrected() {
            if let Some(state) = self.history.states.get(self.current_tick - 1) {
                self.state = *state;
            }
            self.rolling_back = true;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_sim::intent::AbilityCue;
    use skirmish_sim::kit::Kit;

    fn client() -> ClientSimulation {
        let loadout = Arc::new(Kit::brawler().bind(1.0 / 60.0).unwrap());
        ClientSimulation::new(EntityId(0), loadout, Vec2::ZERO, &NetConfig::default())
    }

    #[test]
    fn ticks_advance_and_record_history() {
        let mut c = client();
        for _ in 0..3 {
            c.tick(Input::neutral(999, Vec2::ZERO).with_movement(Vec2::new(1.0, 0.0)));
        }
        assert_eq!(c.current_tick(), 3);
        assert_eq!(c.history().inputs.get(2).map(|i| i.tick), Some(2));
        assert_eq!(c.history().states.get(2), Some(c.state()));
        assert!(c.is_predicting() && !c.is_rolling_back());
    }

    #[test]
    fn latched_request_fires_on_next_tick() {
        let mut c = client();
        assert!(c.try_activate_ability(AbilitySlot::Melee));
        let out = c.tick(Input::neutral(0, Vec2::new(0.0, 5.0)));
        assert!(out.input.actions.melee);
        assert_eq!(out.emissions.cues.len(), 1);
        assert_eq!(c.locomotion(), LocomotionState::Attacking);

        assert!(!c.try_activate_ability(AbilitySlot::Melee), "locked while attacking");
    }

    #[test]
    fn refused_presses_are_not_recorded() {
        let mut c = client();
        c.tick(Input::neutral(0, Vec2::ZERO).with_actions(ActionFlags {
            signature: true,
            ..ActionFlags::default()
        }));
        let recorded = c.history().inputs.get(0).unwrap();
        assert!(!recorded.actions.signature, "signature needs a full charge");
    }

    #[test]
    fn refused_hold_is_not_recorded_but_a_running_one_is() {
        let mut c = client();
        let hold = |tick| {
            Input::neutral(tick, Vec2::ZERO).with_actions(ActionFlags {
                block: true,
                ..ActionFlags::default()
            })
        };
        for t in 0..5 {
            assert!(c.tick(hold(t)).input.actions.block);
        }
        c.tick(Input::neutral(5, Vec2::ZERO));
        // block cooldown starts on release
        let refused = c.tick(hold(6));
        assert!(!refused.input.actions.block);
        assert_eq!(c.locomotion(), LocomotionState::Normal);
    }

    #[derive(Default)]
    struct Presented {
        live: Vec<AbilityCue>,
        replayed: Vec<AbilityCue>,
    }

    impl CueSink for Presented {
        fn on_cue(&mut self, _entity: EntityId, cue: &AbilityCue) {
            self.live.push(*cue);
        }

        fn on_replayed_cue(&mut self, _entity: EntityId, cue: &AbilityCue) {
            self.replayed.push(*cue);
        }
    }

    #[test]
    fn correction_reports_replayed_cues_and_flags_the_rollback() {
        let mut c = client();
        for t in 0..10 {
            let mut input = Input::neutral(t, Vec2::new(0.0, 5.0));
            input.actions.melee = t == 5;
            c.tick(input);
        }
        let mut presented = Presented::default();
        let mut auth = *c.history().states.get(2).unwrap();
        auth.position = Vec2::new(1.0, 0.0);
        let outcome = c.apply_snapshot_with(&AuthoritativeSnapshot::new(EntityId(0), 2, auth), &mut presented);

        assert!(outcome.corrected());
        assert!(presented.live.is_empty());
        assert_eq!(presented.replayed.len(), 1);
        assert_eq!(presented.replayed[0].tick, 5);
        assert_eq!(presented.replayed[0].slot, AbilitySlot::Melee);
        assert!(c.is_rolling_back());

        c.tick(Input::neutral(10, Vec2::ZERO));
        assert!(!c.is_rolling_back());

        let in_sync = AuthoritativeSnapshot::new(EntityId(0), 10, *c.history().states.get(10).unwrap());
        assert!(!c.apply_snapshot_with(&in_sync, &mut presented).corrected());
        assert!(!c.is_rolling_back());
        assert_eq!(presented.replayed.len(), 1);
    }

    #[test]
    fn get_stat_reflects_active_boost() {
        let mut c = client();
        assert_eq!(c.get_stat(StatKind::Damage), 1.0);
        c.try_activate_ability(AbilitySlot::Primary);
        c.tick(Input::neutral(0, Vec2::ZERO));
        assert_eq!(c.get_stat(StatKind::Damage), 1.5);
    }
}
