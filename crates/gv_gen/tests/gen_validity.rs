use gv_gen::{GenConfig, generate};
use gv_script::interpret;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn small(seed: u64) -> GenConfig {
    GenConfig {
        iterations: 4,
        objects_per_iter: 60,
        max_fanout: 5,
        root_percent: 10,
        survivor_percent: 20,
        delete_percent: 5,
        seed: Some(seed),
    }
}

#[test]
fn generated_script_interprets_cleanly() {
    // A fatal script error here would mean the generator referenced
    // a handle before creation, reused a live handle, overflowed a
    // slot index or underflowed a root count.
    let script = generate(&small(42));
    let plan = interpret(&script).expect("generated script must be valid");
    assert_eq!(plan.total_allocated, 4 * 60);
}

#[test]
fn roots_produce_survivors() {
    let plan = interpret(&generate(&small(7))).unwrap();
    assert!(plan.expected_survivors > 0);
    assert!(plan.expected_survivors < plan.total_allocated);
}

#[test]
fn zero_root_config_expects_no_survivors() {
    // Without roots or survivors everything is garbage.
    let config = GenConfig {
        root_percent: 0,
        survivor_percent: 0,
        delete_percent: 0,
        ..small(9)
    };
    let plan = interpret(&generate(&config)).unwrap();
    assert_eq!(plan.expected_survivors, 0);
}

#[test]
fn zero_fanout_never_links() {
    // f = 0 means no object has a slot, so every survivor candidate
    // must fall back to root promotion.
    let config = GenConfig {
        max_fanout: 0,
        ..small(11)
    };
    let plan = interpret(&generate(&config)).unwrap();
    assert!(plan.expected_survivors > 0);
}

#[test]
fn deletions_eventually_release_objects() {
    let config = GenConfig {
        iterations: 8,
        delete_percent: 50,
        ..small(13)
    };
    let plan = interpret(&generate(&config)).unwrap();
    // With aggressive root deletion some early objects must have
    // become unreachable.
    assert!(plan.expected_survivors < plan.total_allocated);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24, max_shrink_iters: 50, .. ProptestConfig::default()
    })]

    #[test]
    fn arbitrary_configs_generate_valid_scripts(
        iterations in 0u32..5,
        objects_per_iter in 1u32..80,
        max_fanout in 0u32..8,
        root_percent in 0u32..120,
        survivor_percent in 0u32..120,
        delete_percent in 0u32..100,
        seed in any::<u64>(),
    ) {
        let config = GenConfig {
            iterations,
            objects_per_iter,
            max_fanout,
            root_percent,
            survivor_percent,
            delete_percent,
            seed: Some(seed),
        };
        let script = generate(&config);
        let plan = interpret(&script);
        prop_assert!(plan.is_ok(), "invalid script: {:?}", plan.err());
    }
}
