//! Property tests for report projections

use fleetcheck_core::report::{
    ReportFormat, decode_fleet_json, render_fleet, render_fleet_attention_html, render_host,
};
use proptest::prelude::*;

use super::strategies::arb_fleet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every format renders the same fleet to the same bytes
    #[test]
    fn fleet_rendering_is_deterministic(fleet in arb_fleet()) {
        for format in [ReportFormat::Json, ReportFormat::Text, ReportFormat::Html] {
            let first = render_fleet(&fleet, format).unwrap();
            let second = render_fleet(&fleet.clone(), format).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Property: host rendering is deterministic
    #[test]
    fn host_rendering_is_deterministic(fleet in arb_fleet()) {
        for host in fleet.host_results.values() {
            for format in [ReportFormat::Json, ReportFormat::Text, ReportFormat::Html] {
                prop_assert_eq!(
                    render_host(host, format).unwrap(),
                    render_host(host, format).unwrap()
                );
            }
        }
    }

    /// Property: JSON decodes back to the same fleet
    #[test]
    fn fleet_json_is_lossless(fleet in arb_fleet()) {
        let json = render_fleet(&fleet, ReportFormat::Json).unwrap();
        prop_assert_eq!(decode_fleet_json(&json).unwrap(), fleet);
    }

    /// Property: the text report carries the headline and every host id
    #[test]
    fn text_report_mentions_every_host(fleet in arb_fleet()) {
        let text = render_fleet(&fleet, ReportFormat::Text).unwrap();
        let headline = fleet.summary().headline();
        prop_assert!(text.contains(&headline));
        for id in fleet.host_results.keys() {
            let host_line = format!("Host: {id}\n");
            prop_assert!(text.contains(&host_line));
        }
    }

    /// Property: raw output never leaks unescaped into HTML
    #[test]
    fn html_has_no_unescaped_markup_from_data(fleet in arb_fleet()) {
        let html = render_fleet_attention_html(&fleet);
        prop_assert!(!html.contains("<script"));
        prop_assert!(html.starts_with("<!DOCTYPE html>"));
    }
}
