//! Property tests for check output parsing and classification

use fleetcheck_core::checks::parser::OutputParser;
use fleetcheck_core::{CheckDefinition, Thresholds, Verdict};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: classification never improves as the value grows
    #[test]
    fn thresholds_are_monotonic(
        warn in 0.0f64..100.0,
        spread in 0.0f64..100.0,
        a in 0.0f64..300.0,
        b in 0.0f64..300.0,
    ) {
        let thresholds = Thresholds::new(warn, warn + spread);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(thresholds.classify(low).severity() <= thresholds.classify(high).severity());
        prop_assert_eq!(thresholds.classify(warn + spread), Verdict::Critical);
    }

    /// Property: the worst disk is the highest capacity among real filesystems
    #[test]
    fn worst_disk_picks_highest_capacity(
        capacities in prop::collection::vec(0u8..=100, 1..8),
        tmpfs_capacity in 0u8..=100,
    ) {
        let mut df = String::from("Filesystem 1024-blocks Used Available Capacity Mounted on\n");
        df.push_str(&format!("tmpfs 1000 10 990 {tmpfs_capacity}% /run\n"));
        for (i, capacity) in capacities.iter().enumerate() {
            df.push_str(&format!("/dev/sd{i} 1000000 500000 500000 {capacity}% /mnt/d{i}\n"));
        }

        let worst = OutputParser::worst_disk(&df).unwrap();
        prop_assert_eq!(Some(&worst.used_percent), capacities.iter().max());
        prop_assert!(worst.filesystem.starts_with("/dev/sd"));
    }

    /// Property: any printed load average parses back and classifies
    #[test]
    fn load_average_parses(load in 0.0f64..64.0) {
        let raw = format!("{load:.2} 0.10 0.05 1/100 12345\n");
        let check = CheckDefinition::load(Thresholds::LOAD);
        let (value, verdict) = check.evaluate(&raw).unwrap();
        let parsed = value.as_f64().unwrap();
        prop_assert!((parsed - load).abs() < 0.01);
        prop_assert_eq!(verdict, Thresholds::LOAD.classify(parsed));
    }

    /// Property: arbitrary text never panics a parser
    #[test]
    fn parsers_never_panic(raw in "\\PC{0,200}") {
        for check in CheckDefinition::defaults() {
            let _ = check.evaluate(&raw);
        }
        let _ = CheckDefinition::service("nginx", "nginx").evaluate(&raw);
    }
}
