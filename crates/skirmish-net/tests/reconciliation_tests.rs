//! End-to-end prediction and reconciliation scenarios.

use std::sync::Arc;

use skirmish_net::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn loadout() -> Arc<Loadout> {
    Arc::new(Kit::brawler().bind(DT).unwrap())
}

fn client_at(position: Vec2, config: &NetConfig) -> ClientSimulation {
    ClientSimulation::new(EntityId(0), loadout(), position, config)
}

fn idle(tick: u64, from: Vec2) -> Input {
    Input::neutral(tick, from + Vec2::new(0.0, 10.0))
}

fn walk(tick: u64, dir: Vec2) -> Input {
    Input::neutral(tick, dir * 100.0).with_movement(dir)
}

// -- snap and replay ---------------------------------------------------------

#[test]
fn divergent_snapshot_snaps_and_replays_buffered_inputs() {
    let config = NetConfig::default();
    let start = Vec2::new(10.0, 0.0);
    let mut client = client_at(start, &config);
    for t in 0..=100 {
        client.tick(idle(t, start));
    }
    for t in 101..120 {
        let mut input = walk(t, Vec2::new(1.0, 0.0));
        if t == 105 {
            input.actions.melee = true;
        }
        client.tick(input);
    }
    let predicted = *client.history().states.get(100).unwrap();
    assert_eq!(predicted.position, Vec2::new(10.0, 0.0));
    let before = client.state().position;

    let mut auth = predicted;
    auth.position = Vec2::new(10.5, 0.0);
    let outcome = client.apply_snapshot(&AuthoritativeSnapshot::new(EntityId(0), 100, auth));

    assert_eq!(
        outcome,
        ReconcileOutcome::Corrected {
            tick: 100,
            error: 0.5,
            replayed: 19
        }
    );
    assert_eq!(client.history().states.get(100).unwrap().position, Vec2::new(10.5, 0.0));
    let after = client.state().position;
    assert!((after.x - before.x - 0.5).abs() < 1e-9);
    assert_eq!(after.y, before.y);
    // the melee press inside the replayed range re-ran with the same result
    assert_eq!(client.state().cooldowns.ready_at(AbilitySlot::Melee), Some(135));
    assert_eq!(client.reconciler().corrections(), 1);
    assert!(client.is_rolling_back());
    client.tick(walk(120, Vec2::new(1.0, 0.0)));
    assert!(!client.is_rolling_back());
}

#[test]
fn corrected_state_matches_a_fresh_forward_run() {
    let config = NetConfig::default();
    let mut client = client_at(Vec2::ZERO, &config);
    for t in 0..40 {
        client.tick(walk(t, Vec2::new(0.6, 0.8)));
    }
    let mut auth = *client.history().states.get(20).unwrap();
    auth.position = auth.position + Vec2::new(-1.0, 0.25);
    client.apply_snapshot(&AuthoritativeSnapshot::new(EntityId(0), 20, auth));

    let lo = loadout();
    let mut forward = auth;
    for t in 21..40 {
        let input = *client.history().inputs.get(t).unwrap();
        forward = simulate_tick(&forward, &input, &AbilityContext::new(t, Role::Predicting, &lo)).state;
    }
    assert_eq!(*client.state(), forward);
}

// -- tolerance ---------------------------------------------------------------

fn history_of(state: EntityState) -> PredictionHistory {
    let mut history = PredictionHistory::new();
    for t in 0..10 {
        history.record(t, Input::neutral(t, Vec2::ZERO), state);
    }
    history
}

#[test]
fn dashing_widens_the_tolerance() {
    let lo = loadout();
    let config = NetConfig::default();
    let error = 0.15;
    assert!(config.position_tolerance < error);
    assert!(error < config.position_tolerance * config.fast_tolerance_multiplier);

    let mut dashing = EntityState::spawn(Vec2::ZERO, &lo);
    dashing.locomotion = LocomotionState::Dashing;
    let mut auth = dashing;
    auth.position = Vec2::new(error, 0.0);
    let mut history = history_of(dashing);
    let outcome = Reconciler::from_config(&config).reconcile(
        &AuthoritativeSnapshot::new(EntityId(0), 5, auth),
        &mut history,
        10,
        &lo,
    );
    assert!(matches!(outcome, ReconcileOutcome::InSync { tick: 5, .. }));

    let normal = EntityState::spawn(Vec2::ZERO, &lo);
    let mut auth = normal;
    auth.position = Vec2::new(error, 0.0);
    let mut history = history_of(normal);
    let outcome = Reconciler::from_config(&config).reconcile(
        &AuthoritativeSnapshot::new(EntityId(0), 5, auth),
        &mut history,
        10,
        &lo,
    );
    assert!(matches!(outcome, ReconcileOutcome::Corrected { tick: 5, replayed: 4, .. }));
}

#[test]
fn locomotion_mismatch_corrects_even_without_position_error() {
    let lo = loadout();
    let state = EntityState::spawn(Vec2::ZERO, &lo);
    let mut auth = state;
    auth.locomotion = LocomotionState::Stunned;
    auth.stun_until = Some(100);
    let mut history = history_of(state);
    let mut rec = Reconciler::from_config(&NetConfig::default());
    let outcome = rec.reconcile(&AuthoritativeSnapshot::new(EntityId(0), 5, auth), &mut history, 10, &lo);
    assert!(outcome.corrected());
    assert_eq!(history.states.get(9).unwrap().locomotion, LocomotionState::Stunned);
}

// -- stat restore policy -----------------------------------------------------

fn boosted_snapshot(client: &ClientSimulation, tick: u64) -> AuthoritativeSnapshot {
    let mut auth = *client.history().states.get(tick).unwrap();
    let mut ledger = StatLedger::from_snapshot(&auth.stats);
    assert!(ledger.add_modifier(StatKind::Damage, 1.5, Budget::Infinite, Budget::Finite(600)));
    auth.stats = ledger.snapshot();
    auth.stat_waits[StatKind::Damage.index()] = Some(AbilitySlot::Primary);
    auth.position = auth.position + Vec2::new(1.0, 0.0);
    AuthoritativeSnapshot::new(EntityId(0), tick, auth)
}

#[test]
fn authoritative_policy_adopts_the_server_ledger() {
    let config = NetConfig::default();
    let mut client = client_at(Vec2::ZERO, &config);
    for t in 0..20 {
        client.tick(idle(t, Vec2::ZERO));
    }
    let snap = boosted_snapshot(&client, 10);
    assert!(client.apply_snapshot(&snap).corrected());
    assert_eq!(client.get_stat(StatKind::Damage), 1.5);
    assert!(!client.try_activate_ability(AbilitySlot::Primary), "waiting on the adopted boost");
}

#[test]
fn local_policy_keeps_the_predicted_ledger() {
    let config = NetConfig {
        stat_restore: StatRestorePolicy::Local,
        ..NetConfig::default()
    };
    let mut client = client_at(Vec2::ZERO, &config);
    for t in 0..20 {
        client.tick(idle(t, Vec2::ZERO));
    }
    let snap = boosted_snapshot(&client, 10);
    assert!(client.apply_snapshot(&snap).corrected());
    assert_eq!(client.get_stat(StatKind::Damage), 1.0);
    assert_eq!(client.state().position.x, 1.0);
    // no modifier, so nothing to wait on either
    assert_eq!(client.state().stat_waits, [None; StatKind::COUNT]);
    assert!(client.try_activate_ability(AbilitySlot::Primary));
}

// -- ordering and desync -----------------------------------------------------

#[test]
fn snapshot_older_than_the_buffer_hard_snaps() {
    let config = NetConfig::default();
    let mut client = client_at(Vec2::ZERO, &config);
    for t in 0..(BUFFER_SIZE as u64 + 100) {
        client.tick(walk(t, Vec2::new(1.0, 0.0)));
    }
    let lo = loadout();
    let auth = EntityState::spawn(Vec2::new(-3.0, 2.0), &lo);
    let outcome = client.apply_snapshot(&AuthoritativeSnapshot::new(EntityId(0), 10, auth));
    assert_eq!(outcome, ReconcileOutcome::HardSnap { tick: 10 });
    assert_eq!(*client.state(), auth);
    assert_eq!(client.reconciler().hard_snaps(), 1);

    let older = AuthoritativeSnapshot::new(EntityId(0), 5, auth);
    assert_eq!(client.apply_snapshot(&older), ReconcileOutcome::Stale { tick: 5 });

    // prediction carries on from the snapped state
    let tick = client.current_tick();
    client.tick(idle(tick, auth.position));
    assert_eq!(client.history().states.get(tick).map(|s| s.position), Some(auth.position));
}

#[test]
fn newest_snapshot_wins_over_late_arrivals() {
    let config = NetConfig::default();
    let mut client = client_at(Vec2::ZERO, &config);
    for t in 0..30 {
        client.tick(walk(t, Vec2::new(1.0, 0.0)));
    }
    let newest = AuthoritativeSnapshot::new(EntityId(0), 25, *client.history().states.get(25).unwrap());
    assert!(matches!(client.apply_snapshot(&newest), ReconcileOutcome::InSync { .. }));

    let mut wrong = *client.history().states.get(20).unwrap();
    wrong.position = Vec2::new(50.0, 50.0);
    let late = AuthoritativeSnapshot::new(EntityId(0), 20, wrong);
    assert_eq!(client.apply_snapshot(&late), ReconcileOutcome::Stale { tick: 20 });
    assert!(client.state().position.x < 5.0);

    let same = AuthoritativeSnapshot::new(EntityId(0), 25, *client.history().states.get(25).unwrap());
    assert!(matches!(client.apply_snapshot(&same), ReconcileOutcome::InSync { .. }));
}

// -- gaps --------------------------------------------------------------------

#[test]
fn lost_inputs_are_filled_and_the_client_converges() {
    let config = NetConfig::default();
    let mut uplink = LinkConfig::lossy(2, 0, 0.5, 11);
    uplink.ordered = true;
    let mut session = DuelSession::new(
        loadout(),
        &config,
        uplink,
        LinkConfig::reliable(2),
        Vec2::ZERO,
        Vec2::new(40.0, 40.0),
    );
    let mut cues: Vec<(EntityId, AbilityCue)> = Vec::new();
    for t in 0..240 {
        let dir = if (t / 10) % 2 == 0 { 1.0 } else { -1.0 };
        let input = if t < 180 {
            walk(t, Vec2::new(dir, 0.0))
        } else {
            idle(t, Vec2::ZERO)
        };
        session.tick(input, Input::neutral(t, Vec2::ZERO), &mut cues);
    }

    let stats = session.stats();
    assert!(stats.inputs_filled > 0, "the lossy uplink should have dropped inputs");
    assert!(stats.corrections > 0, "a held input should have mispredicted a turn");
    assert_eq!(stats.hard_snaps, 0);

    let confirmed = session.player().next_tick() - 1;
    let predicted = session.client().history().states.get(confirmed).unwrap();
    let error = predicted.position.distance(session.player().state().position);
    assert!(error <= config.position_tolerance, "error {error} after settling");
}

// -- replay verification -----------------------------------------------------

#[test]
fn authority_recording_replays_until_a_forcing_event() {
    let mut authority = AuthoritySimulation::new(EntityId(1), loadout(), Vec2::ZERO, GapPolicy::HoldLast);
    authority.start_recording(1);
    for t in 0..20 {
        authority.receive_input(walk(t, Vec2::new(0.0, 1.0)));
    }
    let clean = authority.finish_recording().unwrap();
    let result = replay(&clean).unwrap();
    assert!(result.completed);
    assert_eq!(result.ticks_replayed, 20);

    authority.start_recording(1);
    authority.receive_input(walk(20, Vec2::new(0.0, 1.0)));
    authority.apply_stun(5);
    for t in 21..30 {
        authority.receive_input(walk(t, Vec2::new(0.0, 1.0)));
    }
    let stunned = authority.finish_recording().unwrap();
    let result = replay(&stunned).unwrap();
    assert!(!result.completed);
    assert_eq!(result.first_divergence.map(|d| d.tick), Some(21));
}
