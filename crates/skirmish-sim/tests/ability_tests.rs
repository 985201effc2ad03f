//! Ability and locomotion scenarios driven through the public step API.

use skirmish_sim::prelude::*;

const DT: f64 = 1.0 / 60.0;

// -- helpers ----------------------------------------------------------------

struct Driver {
    loadout: Loadout,
    state: EntityState,
    tick: u64,
    effects: Vec<SideEffect>,
    cues: Vec<AbilityCue>,
}

impl Driver {
    fn new(kit: Kit) -> Self {
        let loadout = kit.bind(DT).unwrap();
        let state = EntityState::spawn(Vec2::ZERO, &loadout);
        Self {
            loadout,
            state,
            tick: 0,
            effects: Vec::new(),
            cues: Vec::new(),
        }
    }

    fn ctx(&self) -> AbilityContext<'_> {
        AbilityContext::new(self.tick, Role::Predicting, &self.loadout)
    }

    fn tick_with(&mut self, movement: Vec2, aim: Vec2, actions: ActionFlags) {
        let input = Input::neutral(self.tick, aim)
            .with_movement(movement)
            .with_actions(actions);
        let out = simulate_tick(&self.state, &input, &self.ctx());
        self.state = out.state;
        self.effects.extend(out.emissions.effects);
        self.cues.extend(out.emissions.cues);
        self.tick += 1;
    }

    fn press(&mut self, actions: ActionFlags) {
        self.tick_with(Vec2::ZERO, Vec2::new(0.0, 10.0), actions);
    }

    fn idle(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.press(ActionFlags::default());
        }
    }

    fn allowed(&self, slot: AbilitySlot) -> bool {
        activation_allowed(&self.state, slot, &self.ctx())
    }
}

fn flags(slot: AbilitySlot) -> ActionFlags {
    let mut f = ActionFlags::default();
    f.press(slot);
    f
}

fn projectile_count(effects: &[SideEffect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e.intent, SideEffectIntent::SpawnProjectile { .. }))
        .count()
}

// -- cooldowns --------------------------------------------------------------

#[test]
fn reactivation_rejected_until_cooldown_elapses() {
    let mut kit = Kit::brawler();
    let melee = kit.abilities.get_mut(&AbilitySlot::Melee).unwrap();
    melee.cooldown_secs = 2.0;
    melee.duration_secs = 0.0;

    let mut d = Driver::new(kit);
    d.press(flags(AbilitySlot::Melee));
    assert_eq!(d.cues.len(), 1);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Melee), Some(120));

    d.idle(118);
    assert_eq!(d.tick, 119);
    assert!(!d.allowed(AbilitySlot::Melee));
    d.press(flags(AbilitySlot::Melee));
    assert_eq!(d.cues.len(), 1, "rejected at tick 119");

    assert_eq!(d.tick, 120);
    assert!(d.allowed(AbilitySlot::Melee));
    d.press(flags(AbilitySlot::Melee));
    assert_eq!(d.cues.len(), 2, "accepted at tick 120");
}

#[test]
fn authority_accepts_one_tick_early() {
    let loadout = Kit::brawler().bind(DT).unwrap();
    let mut state = EntityState::spawn(Vec2::ZERO, &loadout);
    state.cooldowns.set(AbilitySlot::Dash, 0, 60);
    let client = AbilityContext::new(59, Role::Predicting, &loadout);
    let server = AbilityContext::new(59, Role::Authoritative, &loadout);
    assert!(!activation_allowed(&state, AbilitySlot::Dash, &client));
    assert!(activation_allowed(&state, AbilitySlot::Dash, &server));
}

// -- dash -------------------------------------------------------------------

#[test]
fn dash_follows_movement_and_decays() {
    let mut d = Driver::new(Kit::brawler());
    d.tick_with(Vec2::new(1.0, 0.0), Vec2::new(0.0, 10.0), flags(AbilitySlot::Dash));
    assert_eq!(d.state.locomotion, LocomotionState::Dashing);
    assert_eq!(d.state.velocity, Vec2::new(20.0, 0.0));
    let facing = d.state.facing;

    for _ in 0..11 {
        d.tick_with(Vec2::ZERO, Vec2::new(-10.0, 0.0), ActionFlags::default());
        assert_eq!(d.state.locomotion, LocomotionState::Dashing);
        assert_eq!(d.state.facing, facing, "facing frozen while dashing");
    }
    assert!(d.state.velocity.x < 20.0 && d.state.velocity.x > 0.0);

    d.idle(1);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    assert!(d.state.position.x > 2.0, "{:?}", d.state.position);
}

#[test]
fn dash_without_movement_uses_facing() {
    let mut d = Driver::new(Kit::brawler());
    d.tick_with(Vec2::ZERO, Vec2::new(0.0, -10.0), flags(AbilitySlot::Dash));
    assert_eq!(d.state.dash_direction, Vec2::new(0.0, -1.0));
    assert!(d.state.velocity.y < 0.0);
}

// -- holdable states --------------------------------------------------------

#[test]
fn block_persists_while_held_and_ends_on_release() {
    let mut d = Driver::new(Kit::brawler());
    for _ in 0..10 {
        d.press(flags(AbilitySlot::Block));
        assert_eq!(d.state.locomotion, LocomotionState::Blocking);
    }
    assert!(d.state.resources.block_charge < 3.0);
    d.idle(1);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    // Cooldown starts on end.
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Block), Some(10 + 30));
}

#[test]
fn dash_interrupts_block() {
    let mut d = Driver::new(Kit::brawler());
    d.press(flags(AbilitySlot::Block));
    d.press(flags(AbilitySlot::Block));
    let both = ActionFlags {
        block: true,
        dash: true,
        ..ActionFlags::default()
    };
    d.press(both);
    assert_eq!(d.state.locomotion, LocomotionState::Dashing);
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Block), Some(2 + 30));
}

#[test]
fn melee_does_not_interrupt_block() {
    let mut d = Driver::new(Kit::brawler());
    d.press(flags(AbilitySlot::Block));
    let both = ActionFlags {
        block: true,
        melee: true,
        ..ActionFlags::default()
    };
    d.press(both);
    assert_eq!(d.state.locomotion, LocomotionState::Blocking);
    assert!(d.effects.is_empty());
}

#[test]
fn exhausted_block_is_force_ended_and_locked_until_full() {
    let mut d = Driver::new(Kit::brawler());
    let mut ended_at = None;
    for _ in 0..200 {
        d.press(flags(AbilitySlot::Block));
        if d.state.locomotion == LocomotionState::Normal {
            ended_at = Some(d.tick);
            break;
        }
    }
    let ended_at = ended_at.expect("block should run out of charge");
    // 3.0 charge at 1.5/s is two seconds.
    assert!((119..=122).contains(&ended_at), "ended at {ended_at}");
    assert!(!d.state.resources.block_available);

    d.idle(40);
    assert!(!d.allowed(AbilitySlot::Block));
    d.press(flags(AbilitySlot::Block));
    assert_eq!(d.state.locomotion, LocomotionState::Normal);

    d.idle(200);
    assert!(d.state.resources.block_available);
    assert!(d.allowed(AbilitySlot::Block));
}

#[test]
fn held_fire_is_paced_by_cooldown() {
    let mut d = Driver::new(Kit::brawler());
    for _ in 0..31 {
        d.press(flags(AbilitySlot::Projectile));
        assert_eq!(d.state.locomotion, LocomotionState::Firing);
    }
    // 0.25 s interval = 15 ticks: shots at 0, 15 and 30.
    assert_eq!(projectile_count(&d.effects), 3);
    assert_eq!(d.cues.len(), 1, "entering Firing cues once");

    d.idle(1);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
}

#[test]
fn re_entering_firing_keeps_shot_pacing() {
    let mut d = Driver::new(Kit::brawler());
    d.press(flags(AbilitySlot::Projectile));
    d.idle(1);
    d.press(flags(AbilitySlot::Projectile));
    assert_eq!(d.state.locomotion, LocomotionState::Firing);
    assert_eq!(projectile_count(&d.effects), 1);
}

// -- signature --------------------------------------------------------------

#[test]
fn signature_requires_full_charge() {
    let mut d = Driver::new(Kit::brawler());
    assert!(!d.allowed(AbilitySlot::Signature));
    d.press(flags(AbilitySlot::Signature));
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    assert!(d.cues.is_empty());
}

#[test]
fn signature_bursts_then_resets_charge() {
    let mut d = Driver::new(Kit::brawler());
    d.state.resources.signature_charge = 100.0;
    d.tick_with(Vec2::new(1.0, 0.0), Vec2::new(0.0, 10.0), flags(AbilitySlot::Signature));
    assert_eq!(d.state.locomotion, LocomotionState::UsingSignatureAbility);
    assert_eq!(projectile_count(&d.effects), 1);

    for _ in 0..17 {
        d.tick_with(Vec2::new(1.0, 0.0), Vec2::new(0.0, 10.0), ActionFlags::default());
        assert_eq!(d.state.velocity, Vec2::ZERO, "signature locks movement");
    }
    assert_eq!(projectile_count(&d.effects), 3);
    assert_eq!(d.state.locomotion, LocomotionState::UsingSignatureAbility);

    d.idle(1);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    assert!(d.state.resources.signature_charge < 0.1);
}

// -- stat-gated abilities ---------------------------------------------------

#[test]
fn damage_boost_scales_melee_and_gates_cooldown_on_expiry() {
    let mut d = Driver::new(Kit::brawler());
    d.press(flags(AbilitySlot::Primary));
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    assert_eq!(d.state.stats.len(), 1);
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Primary), None);
    assert!(!d.allowed(AbilitySlot::Primary), "waiting on the boost");

    d.press(flags(AbilitySlot::Melee));
    match d.effects.last().map(|e| e.intent) {
        Some(SideEffectIntent::MeleeHitCheck { damage, .. }) => assert_eq!(damage, 15.0),
        other => panic!("expected a melee hit-check, got {other:?}"),
    }

    // Boost added on tick 0 lasts 300 ticks and expires during tick 299.
    d.idle(297);
    assert_eq!(d.tick, 299);
    assert_eq!(d.state.stats.len(), 1);
    d.idle(1);
    assert!(d.state.stats.is_empty());
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Primary), Some(299 + 480));
    assert!(!d.allowed(AbilitySlot::Primary));
}

#[test]
fn ranged_boost_spends_charges_per_shot() {
    let mut kit = Kit::brawler();
    kit.abilities.insert(
        AbilitySlot::Primary,
        AbilityDescriptor::new(
            AbilityKind::StatBoost {
                stat: StatKind::RangedDamage,
                multiplier: 2.0,
                charges: Budget::Finite(2),
                duration_secs: None,
            },
            LocomotionState::Normal,
            8.0,
        ),
    );
    let mut d = Driver::new(kit);
    d.press(flags(AbilitySlot::Primary));
    for _ in 0..31 {
        d.press(flags(AbilitySlot::Projectile));
    }

    let damages: Vec<f64> = d
        .effects
        .iter()
        .filter_map(|e| match e.intent {
            SideEffectIntent::SpawnProjectile { damage, .. } => Some(damage),
            _ => None,
        })
        .collect();
    assert_eq!(damages, vec![8.0, 8.0, 4.0]);
    // Second shot on tick 16 consumed the last charge.
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Primary), Some(16 + 480));
}

#[test]
fn damage_boost_with_charges_is_spent_by_swings() {
    let mut kit = Kit::brawler();
    kit.abilities.insert(
        AbilitySlot::Primary,
        AbilityDescriptor::new(
            AbilityKind::StatBoost {
                stat: StatKind::Damage,
                multiplier: 1.5,
                charges: Budget::Finite(2),
                duration_secs: None,
            },
            LocomotionState::Normal,
            8.0,
        ),
    );
    let mut d = Driver::new(kit);
    d.press(flags(AbilitySlot::Primary));
    assert!(!d.allowed(AbilitySlot::Primary));

    d.press(flags(AbilitySlot::Melee));
    d.idle(40);
    let second = d.tick;
    d.press(flags(AbilitySlot::Melee));
    assert!(d.state.stats.is_empty(), "second swing spends the last charge");
    assert_eq!(d.state.stat_waits, [None; StatKind::COUNT]);
    assert_eq!(d.state.cooldowns.ready_at(AbilitySlot::Primary), Some(second + 480));

    d.idle(40);
    d.press(flags(AbilitySlot::Melee));
    let damages: Vec<f64> = d
        .effects
        .iter()
        .filter_map(|e| match e.intent {
            SideEffectIntent::MeleeHitCheck { damage, .. } => Some(damage),
            _ => None,
        })
        .collect();
    assert_eq!(damages, vec![15.0, 15.0, 10.0]);

    d.idle(second + 480 - d.tick);
    assert!(d.allowed(AbilitySlot::Primary));
}

// -- zones and colliders ----------------------------------------------------

#[test]
fn zone_is_clamped_to_max_range_at_aim() {
    let mut kit = Kit::brawler();
    kit.abilities.insert(
        AbilitySlot::Primary,
        AbilityDescriptor::new(
            AbilityKind::SpawnZone {
                damage_per_interval: 3.0,
                zone_duration_secs: 4.0,
                damage_interval_secs: 0.5,
                at_aim: true,
                max_range: 5.0,
            },
            LocomotionState::UsingPrimaryAbility,
            10.0,
        )
        .with_duration(0.5)
        .locking_movement(),
    );
    let mut d = Driver::new(kit);
    d.tick_with(Vec2::ZERO, Vec2::new(20.0, 0.0), flags(AbilitySlot::Primary));
    assert_eq!(d.state.locomotion, LocomotionState::UsingPrimaryAbility);
    match d.effects.as_slice() {
        [SideEffect {
            intent: SideEffectIntent::SpawnZone { center, .. },
            ..
        }] => assert_eq!(*center, Vec2::new(5.0, 0.0)),
        other => panic!("expected one zone, got {other:?}"),
    }
    d.idle(30);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
}

#[test]
fn collider_burst_spawns_in_front() {
    let mut kit = Kit::brawler();
    kit.abilities.insert(
        AbilitySlot::Primary,
        AbilityDescriptor::new(
            AbilityKind::ColliderBurst { offset: 2.0 },
            LocomotionState::UsingPrimaryAbility,
            3.0,
        )
        .with_duration(0.2),
    );
    let mut d = Driver::new(kit);
    d.tick_with(Vec2::ZERO, Vec2::new(0.0, 10.0), flags(AbilitySlot::Primary));
    assert_eq!(
        d.effects[0].intent,
        SideEffectIntent::SpawnCollider {
            center: Vec2::new(0.0, 2.0),
            facing: Vec2::UP,
        }
    );
}

// -- priority ---------------------------------------------------------------

#[test]
fn dash_wins_over_other_presses() {
    let mut d = Driver::new(Kit::brawler());
    let all = ActionFlags {
        dash: true,
        melee: true,
        primary: true,
        signature: true,
        projectile: true,
        block: true,
    };
    d.press(all);
    assert_eq!(d.state.locomotion, LocomotionState::Dashing);
    assert_eq!(d.cues.len(), 1);
    assert_eq!(d.cues[0].slot, AbilitySlot::Dash);
}

#[test]
fn rejected_press_falls_through_to_the_next_slot() {
    let mut d = Driver::new(Kit::brawler());
    d.press(ActionFlags {
        dash: true,
        ..ActionFlags::default()
    });
    d.idle(29);
    assert_eq!(d.state.locomotion, LocomotionState::Normal);
    d.cues.clear();

    d.press(ActionFlags {
        dash: true,
        melee: true,
        ..ActionFlags::default()
    });
    assert_eq!(d.state.locomotion, LocomotionState::Attacking);
    assert_eq!(d.cues.len(), 1);
    assert_eq!(d.cues[0].slot, AbilitySlot::Melee);
}
