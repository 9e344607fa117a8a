use std::collections::BTreeSet;

use drillhall_game::{
    ActionCategory, Catalogs, Record, RulesConfig, RunResult, Stat, ruleset_fingerprint,
};
use serde_json::Value;

#[test]
fn every_category_has_an_action() {
    let catalogs = Catalogs::load_from_static().unwrap();
    let categories: BTreeSet<ActionCategory> = catalogs
        .actions
        .iter()
        .map(|action| action.category)
        .collect();
    assert_eq!(categories.len(), ActionCategory::ALL.len());
}

#[test]
fn action_content_is_well_formed() {
    let catalogs = Catalogs::load_from_static().unwrap();
    for action in catalogs.actions.iter() {
        let (lo, hi) = action.hp_cost_range();
        assert!(lo <= hi, "{}", action.id);
        assert!(!action.label.is_empty(), "{}", action.id);
        assert!(!action.stat_deltas.is_empty(), "{}", action.id);
        assert!(
            action.stat_deltas.values().all(|delta| *delta != 0),
            "{} declares a zero delta",
            action.id
        );
    }
    let gated = catalogs.actions.get("deep_sleep").unwrap();
    assert_eq!(gated.requirements.min_ap, Some(50));
    assert_eq!(gated.requirements.min_depth, Some(1));
    let augment = catalogs.actions.get("body_dev").unwrap();
    assert_eq!(augment.stat_deltas.get(&Stat::Power), Some(&-5));
}

#[test]
fn event_ranges_are_ordered() {
    let catalogs = Catalogs::load_from_static().unwrap();
    for event in &catalogs.events.events {
        assert!(event.hp_min <= event.hp_max, "{}", event.id);
    }
}

#[test]
fn fingerprint_survives_serialization() {
    let catalogs = Catalogs::load_from_static().unwrap();
    let rules = RulesConfig::load_from_static();
    let restored_catalogs: Catalogs =
        serde_json::from_str(&serde_json::to_string(&catalogs).unwrap()).unwrap();
    let restored_rules = RulesConfig::from_json(&serde_json::to_string(&rules).unwrap()).unwrap();
    assert_eq!(
        ruleset_fingerprint(&catalogs, &rules),
        ruleset_fingerprint(&restored_catalogs, &restored_rules)
    );
}

#[test]
fn record_json_shape_is_stable() {
    let json = r#"{
        "id": 4,
        "final_stats": { "resistance": 12, "power": 40 },
        "total_turns": 21,
        "timestamp": "2025-03-04T05:06:07Z",
        "rank": "Silver",
        "result": { "kind": "defeated_by", "boss": "Hieron" }
    }"#;
    let record: Record = serde_json::from_str(json).unwrap();
    assert_eq!(record.final_stats.power, 40);
    assert_eq!(record.loops_cleared, 0);
    assert_eq!(
        record.result,
        RunResult::DefeatedBy {
            boss: "Hieron".to_string()
        }
    );

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["result"]["kind"], Value::from("defeated_by"));
    assert_eq!(value["final_stats"]["sensitivity"], Value::from(0));
}
