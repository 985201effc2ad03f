//! Property tests for the simulation step.
//!
//! Random input scripts are fed through `simulate_tick` and the results are
//! checked for determinism, replay equivalence and the ledger / cooldown
//! invariants.

use proptest::prelude::*;
use skirmish_sim::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn coord() -> impl Strategy<Value = f64> {
    (-2_000i32..2_000i32).prop_map(|v| v as f64 * 0.01)
}

fn movement() -> impl Strategy<Value = Vec2> {
    prop_oneof![
        Just(Vec2::ZERO),
        (0u32..8).prop_map(|octant| {
            let angle = octant as f64 * std::f64::consts::FRAC_PI_4;
            Vec2::new(angle.cos(), angle.sin())
        }),
    ]
}

fn actions() -> impl Strategy<Value = ActionFlags> {
    // Presses are rare; holds come in runs.
    (0u8..40, any::<bool>(), any::<bool>()).prop_map(|(press, block, projectile)| {
        let mut flags = ActionFlags {
            block: block && press % 3 == 0,
            projectile: projectile && press % 5 == 0,
            ..ActionFlags::default()
        };
        match press {
            0 => flags.dash = true,
            1 => flags.melee = true,
            2 => flags.primary = true,
            3 => flags.signature = true,
            _ => {}
        }
        flags
    })
}

fn script() -> impl Strategy<Value = Vec<(Vec2, Vec2, ActionFlags)>> {
    prop::collection::vec((movement(), (coord(), coord()), actions()), 1..240)
        .prop_map(|v| v.into_iter().map(|(m, (x, y), a)| (m, Vec2::new(x, y), a)).collect())
}

fn inputs(script: &[(Vec2, Vec2, ActionFlags)]) -> Vec<Input> {
    script
        .iter()
        .enumerate()
        .map(|(t, (m, aim, a))| {
            Input::neutral(t as u64, *aim)
                .with_movement(*m)
                .with_actions(*a)
        })
        .collect()
}

fn run(loadout: &Loadout, start: EntityState, inputs: &[Input], role: Role) -> Vec<EntityState> {
    let mut state = start;
    let mut states = Vec::with_capacity(inputs.len());
    for input in inputs {
        let ctx = AbilityContext::new(input.tick, role, loadout);
        state = simulate_tick(&state, input, &ctx).state;
        states.push(state);
    }
    states
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn identical_runs_produce_identical_histories(script in script()) {
        let loadout = Kit::brawler().bind(DT).unwrap();
        let start = EntityState::spawn(Vec2::ZERO, &loadout);
        let inputs = inputs(&script);

        let a = run(&loadout, start, &inputs, Role::Predicting);
        let b = run(&loadout, start, &inputs, Role::Predicting);
        prop_assert_eq!(&a, &b);
        let last = a.len() - 1;
        prop_assert_eq!(a[last].state_hash(), b[last].state_hash());
    }

    #[test]
    fn replay_from_stored_state_matches_forward_run(script in script(), split in 0usize..240) {
        let loadout = Kit::brawler().bind(DT).unwrap();
        let start = EntityState::spawn(Vec2::new(1.0, -1.0), &loadout);
        let inputs = inputs(&script);
        let split = split % inputs.len();

        let forward = run(&loadout, start, &inputs, Role::Predicting);
        let replayed = run(&loadout, forward[split], &inputs[split + 1..], Role::Predicting);
        prop_assert_eq!(&forward[split + 1..], replayed.as_slice());
    }

    #[test]
    fn ledger_never_exceeds_capacity(script in script()) {
        let mut kit = Kit::brawler();
        kit.abilities.insert(
            AbilitySlot::Primary,
            AbilityDescriptor::new(
                AbilityKind::StatBoost {
                    stat: StatKind::MoveSpeed,
                    multiplier: 1.1,
                    charges: Budget::Infinite,
                    duration_secs: Some(10.0),
                },
                LocomotionState::Normal,
                0.0,
            ),
        );
        let loadout = kit.bind(DT).unwrap();
        let start = EntityState::spawn(Vec2::ZERO, &loadout);
        for state in run(&loadout, start, &inputs(&script), Role::Authoritative) {
            prop_assert!(state.stats.len() <= MAX_MODIFIERS);
            prop_assert!(state.position.is_finite() && state.velocity.is_finite());
        }
    }

    #[test]
    fn cooldown_holds_for_exactly_its_duration(start in 0u64..10_000, duration in 0u64..1_000) {
        let mut table = CooldownTable::new();
        table.set(AbilitySlot::Melee, start, duration);
        for t in start..start + duration {
            prop_assert!(table.is_on_cooldown(AbilitySlot::Melee, t, Role::Predicting));
        }
        prop_assert!(!table.is_on_cooldown(AbilitySlot::Melee, start + duration, Role::Predicting));
    }

    #[test]
    fn block_charge_stays_in_range(script in script()) {
        let loadout = Kit::brawler().bind(DT).unwrap();
        let start = EntityState::spawn(Vec2::ZERO, &loadout);
        let max = loadout.kit().resources.block.max_charge;
        for state in run(&loadout, start, &inputs(&script), Role::Predicting) {
            prop_assert!((0.0..=max).contains(&state.resources.block_charge));
            if state.locomotion == LocomotionState::Blocking {
                prop_assert!(state.resources.block_available);
            }
        }
    }
}
