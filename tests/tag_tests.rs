//! Tests for tag maps and legacy list-form tags

use schema_graph_sdk::models::tag::tags_from_legacy_list;
use schema_graph_sdk::models::{DataType, Field, Tag, TagMap, merge_tags};
use std::str::FromStr;

fn map(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_simple_tag_parsing() {
    let tag = Tag::from_str("finance").unwrap();
    assert_eq!(tag, Tag::Simple("finance".to_string()));
    assert_eq!(tag.to_string(), "finance");
}

#[test]
fn test_pair_tag_parsing() {
    let tag = Tag::from_str("Environment:Dev").unwrap();
    assert_eq!(tag, Tag::Pair("Environment".to_string(), "Dev".to_string()));
    assert_eq!(tag.to_string(), "Environment:Dev");
}

#[test]
fn test_list_tag_parsing() {
    let tag = Tag::from_str("SecondaryDomains:[XXXXX, PPPP]").unwrap();
    assert_eq!(
        tag,
        Tag::List(
            "SecondaryDomains".to_string(),
            vec!["XXXXX".to_string(), "PPPP".to_string()]
        )
    );
    assert_eq!(tag.to_string(), "SecondaryDomains:[XXXXX, PPPP]");
}

#[test]
fn test_malformed_tags_treated_as_simple() {
    let tag = Tag::from_str("key:value:extra").unwrap();
    assert_eq!(tag, Tag::Simple("key:value:extra".to_string()));

    let tag = Tag::from_str("key:").unwrap();
    assert_eq!(tag, Tag::Simple("key:".to_string()));

    assert!(Tag::from_str("   ").is_err());
}

#[test]
fn test_tag_parsing_edge_cases() {
    let tag = Tag::from_str("  finance  ").unwrap();
    assert_eq!(tag, Tag::Simple("finance".to_string()));

    let tag = Tag::from_str("Environment: Dev").unwrap();
    assert_eq!(tag, Tag::Pair("Environment".to_string(), "Dev".to_string()));

    let tag = Tag::from_str("Domains:[ A , B ]").unwrap();
    assert_eq!(
        tag,
        Tag::List("Domains".to_string(), vec!["A".to_string(), "B".to_string()])
    );
}

#[test]
fn test_legacy_list_folds_into_map() {
    let tags = tags_from_legacy_list(["pii", "owner:data-team", "domains:[sales, finance]", "", "owner:platform"]);
    assert_eq!(
        tags,
        map(&[
            ("domains", "sales,finance"),
            ("owner", "platform"),
            ("pii", ""),
        ])
    );
}

#[test]
fn test_merge_prefers_overrides() {
    let primary_key = Field::new("id", DataType::Int)
        .with_tag("pii", "false")
        .with_tag("domain", "crm");
    let foreign_key = Field::new("customer_id", DataType::Int).with_tag("pii", "true");

    let merged = merge_tags(&primary_key.tags, &foreign_key.tags);
    assert_eq!(merged, map(&[("domain", "crm"), ("pii", "true")]));
    assert_eq!(primary_key.tags["pii"], "false");
}

#[test]
fn test_merge_with_empty_maps() {
    let tags = map(&[("tier", "gold")]);
    assert_eq!(merge_tags(&TagMap::new(), &tags), tags);
    assert_eq!(merge_tags(&tags, &TagMap::new()), tags);
}
