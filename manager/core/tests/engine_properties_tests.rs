// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;
use tag_manager_core::application::{
    AssociationResolver, EnforcementPlanner, TagAnalyzer, ValueResolver,
};
use tag_manager_core::domain::enforcement::SentinelConvention;
use tag_manager_core::domain::events::EngineEvent;
use tag_manager_core::domain::manager_config::AssociationConfig;
use tag_manager_core::domain::org::OrgLookup;
use tag_manager_core::domain::policy::TagPolicyConfig;
use tag_manager_core::domain::resource::{
    RawResourceDocument, ResourceSnapshot, ResourceType,
};
use tag_manager_core::infrastructure::audit::RecordingEventSink;

fn product_policy() -> TagPolicyConfig {
    TagPolicyConfig::from_document(&json!({
        "product": {
            "validKeyNames": ["product", "fuse:product"],
            "values": ["outcomes", "care"],
            "required": true
        }
    }))
    .unwrap()
}

fn rich_policy() -> TagPolicyConfig {
    TagPolicyConfig::from_document(&json!({
        "product": {
            "validKeyNames": ["product", "fuse:product", "Product"],
            "values": ["outcomes", "care"],
            "required": true
        },
        "apmid": {
            "validKeyNames": ["apm-id"],
            "values": { "outcomes": "APM0001", "care": "APM0002" },
            "required": true,
            "lookupValue": "product"
        },
        "team": { "validKeyNames": ["fuse:team"], "copyValue": "fuse:product" },
        "owner": { "alwaysPopulate": true, "required": true },
        "environment": { "validKeyNames": ["env"], "values": ["dev", "prod"] }
    }))
    .unwrap()
}

fn snapshot(value: serde_json::Value) -> ResourceSnapshot {
    let raw: RawResourceDocument = serde_json::from_value(value).unwrap();
    ResourceSnapshot::from_document(raw).unwrap()
}

fn sample_snapshots() -> Vec<ResourceSnapshot> {
    vec![
        snapshot(json!({ "primaryKey": "EC2-1", "InstanceId": "i-1", "Tags": [
            { "Key": "fuse:product", "Value": "Outcomes" },
            { "Key": "apm-id", "Value": "apm0001" },
            { "Key": "env", "Value": "staging" },
            { "Key": "Name", "Value": "web" }
        ]})),
        snapshot(json!({ "primaryKey": "S3-2", "Name": "logs", "Tags": [
            { "Key": "Product", "Value": "care" },
            { "Key": "fuse:team", "Value": "care" },
            { "Key": "owner", "Value": "" },
            { "Key": "APMID", "Value": "x" }
        ]})),
        snapshot(json!({ "primaryKey": "EBS-3", "VolumeId": "vol-3" })),
    ]
}

#[test]
fn classify_is_idempotent() {
    let analyzer = TagAnalyzer::new(Arc::new(RecordingEventSink::new()));
    let policy = rich_policy();

    for snapshot in sample_snapshots() {
        let first = serde_json::to_string(&analyzer.classify(&snapshot, &policy)).unwrap();
        let second = serde_json::to_string(&analyzer.classify(&snapshot, &policy)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn classification_partitions_every_raw_key() {
    let analyzer = TagAnalyzer::new(Arc::new(RecordingEventSink::new()));
    let policy = rich_policy();

    for snapshot in sample_snapshots() {
        let analysis = analyzer.classify(&snapshot, &policy);

        let resolved: BTreeSet<String> = snapshot
            .raw_tags
            .iter()
            .map(|t| policy.resolve_canonical_key(&t.key))
            .collect();
        let classified: BTreeSet<String> = analysis
            .matched_tags
            .keys()
            .chain(analysis.invalid_tags.keys())
            .chain(analysis.extra_tags.keys())
            .cloned()
            .collect();
        assert_eq!(classified, resolved, "partition mismatch for {}", snapshot.key());

        let total = analysis.matched_tags.len() + analysis.invalid_tags.len() + analysis.extra_tags.len();
        assert_eq!(total, resolved.len(), "tag counted twice on {}", snapshot.key());

        for missing in &analysis.unmatched_tags {
            assert!(policy.get(missing).is_some_and(|t| t.required));
            assert!(!resolved.contains(missing));
        }
    }
}

#[test]
fn aliases_resolve_to_their_canonical_name() {
    let policy = rich_policy();
    for tag in policy.tags() {
        assert_eq!(policy.resolve_canonical_key(&tag.canonical), tag.canonical);
        for alias in &tag.aliases {
            assert_eq!(policy.resolve_canonical_key(alias), tag.canonical);
        }
    }
}

#[test]
fn derive_value_is_total() {
    let sink = Arc::new(RecordingEventSink::new());
    let resolver = ValueResolver::new(sink.clone());
    let policy = rich_policy();
    let key = tag_manager_core::domain::resource::ResourceKey::new(ResourceType::Ec2, "i-9");

    let contexts = [
        BTreeMap::new(),
        BTreeMap::from([("product".to_string(), "unknown".to_string())]),
        BTreeMap::from([("product".to_string(), "CARE".to_string())]),
    ];
    for matched in &contexts {
        for name in ["product", "apmid", "team", "owner", "environment", "unmanaged"] {
            let _ = resolver.derive_value(name, matched, &key, &policy);
        }
    }

    let with_care = &contexts[2];
    assert_eq!(
        resolver.derive_value("apmid", with_care, &key, &policy).as_deref(),
        Some("APM0002")
    );
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::UnresolvedLookupReference { .. })));
}

#[test]
fn scenario_alias_spelling_matches_product() {
    let analyzer = TagAnalyzer::new(Arc::new(RecordingEventSink::new()));
    let analysis = analyzer.classify(
        &snapshot(json!({
            "primaryKey": "EC2-1",
            "InstanceId": "i-1",
            "Tags": [{ "Key": "fuse:product", "Value": "Outcomes" }]
        })),
        &product_policy(),
    );

    assert_eq!(analysis.matched_tags.get("product").map(String::as_str), Some("Outcomes"));
    assert!(analysis.unmatched_tags.is_empty());
}

#[test]
fn scenario_untagged_resource_gets_missing_marker() {
    let sink = Arc::new(RecordingEventSink::new());
    let analyzer = TagAnalyzer::new(sink.clone());
    let planner = EnforcementPlanner::new(SentinelConvention::default(), sink);
    let policy = product_policy();

    let analysis = analyzer.classify(
        &snapshot(json!({ "primaryKey": "EC2-1", "InstanceId": "i-1", "Tags": [] })),
        &policy,
    );
    assert_eq!(analysis.unmatched_tags, vec!["product".to_string()]);
    assert!(analysis.matched_tags.is_empty());
    assert!(analysis.invalid_tags.is_empty());
    assert!(analysis.extra_tags.is_empty());

    let action = planner.compute_action(&analysis, &policy).unwrap();
    let marker = SentinelConvention::default().missing_keys_tag();
    let listed = SentinelConvention::split(&action.tags_to_write[&marker]);
    assert!(listed.contains(&"product".to_string()));
}

#[test]
fn scenario_volume_inherits_instance_product() {
    let sink = Arc::new(RecordingEventSink::new());
    let analyzer = TagAnalyzer::new(sink.clone());
    let resolver = AssociationResolver::new(&AssociationConfig::default(), sink);
    let policy = product_policy();

    let snapshots = vec![
        snapshot(json!({
            "primaryKey": "EBS-v",
            "VolumeId": "vol-1",
            "Tags": [{ "Key": "Name", "Value": "data" }],
            "Attachments": [{ "InstanceId": "i-123", "State": "attached" }]
        })),
        snapshot(json!({
            "primaryKey": "EC2-i",
            "InstanceId": "i-123",
            "Tags": [{ "Key": "product", "Value": "Care" }]
        })),
    ];

    let analyses = resolver.resolve(
        analyzer.classify_all(&snapshots, &policy),
        &OrgLookup::default(),
        &policy,
    );

    let volume = &analyses[0];
    assert_eq!(
        volume.force_add_tags,
        vec![BTreeMap::from([("product".to_string(), "Care".to_string())])]
    );
    assert!(!volume.invalid_tags.contains_key("product"));
    assert!(!volume.unmatched_tags.contains(&"product".to_string()));
    assert_eq!(analyses[1].force_add_tags, Vec::<BTreeMap<String, String>>::new());
}

#[test]
fn volume_with_invalid_product_is_overridden_by_instance() {
    let sink = Arc::new(RecordingEventSink::new());
    let analyzer = TagAnalyzer::new(sink.clone());
    let resolver = AssociationResolver::new(&AssociationConfig::default(), sink.clone());
    let policy = product_policy();

    let snapshots = vec![
        snapshot(json!({
            "primaryKey": "EC2-i",
            "InstanceId": "i-1",
            "Tags": [{ "Key": "product", "Value": "Outcomes" }]
        })),
        snapshot(json!({
            "primaryKey": "EBS-v",
            "VolumeId": "vol-1",
            "Tags": [{ "Key": "fuse:product", "Value": "legacy" }],
            "Attachments": [{ "InstanceId": "i-1" }, { "InstanceId": "i-2" }]
        })),
    ];
    let analyses = resolver.resolve(
        analyzer.classify_all(&snapshots, &policy),
        &OrgLookup::default(),
        &policy,
    );

    assert_eq!(
        analyses[1].force_add_tags,
        vec![BTreeMap::from([("product".to_string(), "Outcomes".to_string())])]
    );
    assert!(analyses[1].invalid_tags.is_empty());

    let planner = EnforcementPlanner::new(SentinelConvention::default(), sink);
    let action = planner.compute_action(&analyses[1], &policy).unwrap();
    assert_eq!(
        action.tags_to_write,
        BTreeMap::from([("fuse:product".to_string(), "Outcomes".to_string())])
    );
}

#[test]
fn no_action_when_tag_set_is_unchanged() {
    let sink = Arc::new(RecordingEventSink::new());
    let analyzer = TagAnalyzer::new(sink.clone());
    let planner = EnforcementPlanner::new(SentinelConvention::default(), sink);
    let policy = product_policy();

    let compliant = snapshot(json!({
        "primaryKey": "S3-1",
        "Name": "bucket",
        "Tags": [{ "Key": "product", "Value": "care" }, { "Key": "Name", "Value": "b" }]
    }));
    let analysis = analyzer.classify(&compliant, &policy);

    assert!(planner.compute_actions(&[analysis], &policy).is_empty());
}

#[test]
fn planner_output_for_full_replace_targets_carries_preserved_tags() {
    let sink = Arc::new(RecordingEventSink::new());
    let analyzer = TagAnalyzer::new(sink.clone());
    let planner = EnforcementPlanner::new(SentinelConvention::default(), sink);
    let policy = rich_policy();

    let bucket = snapshot(json!({
        "primaryKey": "S3-1",
        "Name": "bucket",
        "Tags": [
            { "Key": "product", "Value": "care" },
            { "Key": "cost-center", "Value": "42" }
        ]
    }));
    let action = planner
        .compute_action(&analyzer.classify(&bucket, &policy), &policy)
        .unwrap();

    assert_eq!(action.resource_type, ResourceType::S3);
    assert_eq!(action.tags_to_write["product"], "care");
    assert_eq!(action.tags_to_write["cost-center"], "42");
    assert_eq!(action.tags_to_write["apmid"], "APM0002");
    assert_eq!(action.tags_to_write["owner"], "owner");
}
