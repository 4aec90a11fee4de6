//! Property tests for the notification policy

use fleetcheck_core::{IntentKind, NotificationPolicy, NotifySettings, TargetDescriptor};
use proptest::prelude::*;

use super::strategies::arb_fleet;

fn settings(admin_digests: bool, directors: bool) -> NotifySettings {
    NotifySettings {
        recipients: vec!["ops@example.com".into()],
        admin_contact: Some("admin@example.com".into()),
        director_recipients: if directors {
            vec!["cto@example.com".into()]
        } else {
            Vec::new()
        },
        admin_digests,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: one alert per unreachable host and exactly one fleet summary,
    /// whatever digests are enabled
    #[test]
    fn intent_counts_match_fleet(
        fleet in arb_fleet(),
        admin_digests in any::<bool>(),
        directors in any::<bool>(),
    ) {
        let targets: Vec<TargetDescriptor> = fleet
            .host_results
            .keys()
            .enumerate()
            .map(|(i, id)| {
                let target = TargetDescriptor::new(id.clone(), "10.0.0.1");
                if i % 2 == 0 {
                    target.with_admin_contact(format!("admin{}@example.com", i % 3))
                } else {
                    target
                }
            })
            .collect();
        let policy = NotificationPolicy::new(settings(admin_digests, directors), &targets);
        let intents = policy.intents(&fleet);

        let alerts = intents
            .iter()
            .filter(|i| matches!(i.kind, IntentKind::HostAlert { .. }))
            .count();
        let summaries = intents
            .iter()
            .filter(|i| i.kind == IntentKind::FleetSummary)
            .count();
        let unreachable = fleet.host_results.values().filter(|h| !h.reachable).count();

        prop_assert_eq!(alerts, unreachable);
        prop_assert_eq!(summaries, 1);

        for intent in &intents {
            prop_assert!(intent.has_recipients());
        }

        let attention = intents
            .iter()
            .filter(|i| i.kind == IntentKind::AttentionDigest)
            .count();
        let needs_attention = fleet
            .host_results
            .values()
            .any(|h| h.health().needs_attention());
        prop_assert_eq!(attention, usize::from(directors && needs_attention));
    }

    /// Property: the policy is a pure function of its input
    #[test]
    fn intents_are_deterministic(fleet in arb_fleet()) {
        let policy = NotificationPolicy::new(settings(true, true), &[]);
        prop_assert_eq!(policy.intents(&fleet), policy.intents(&fleet));
    }
}
