//! Sharding resolver scenarios: key computation, membership tests and
//! registry-created calculators.

use std::sync::Arc;

use dbal::models::{ColumnDefine, TableDefine, ValueType, JDBC_BIGINT, JDBC_VARCHAR};
use dbal::sharding::{
    create_calculator, register_calculator, row, Calculator, ModuloCalculator, RangeCalculator,
    ShardingAxis, ShardingConfig, ShardingDetails,
};
use serde_json::json;

fn orders_table() -> TableDefine {
    TableDefine::new(
        "orders",
        vec![
            ColumnDefine::new("id", JDBC_BIGINT, ValueType::Long),
            ColumnDefine::new("tenant_id", JDBC_BIGINT, ValueType::Long),
            ColumnDefine::new("region", JDBC_VARCHAR, ValueType::String),
        ],
    )
}

/// Routes tenants into four buckets but only claims bucket 1 as its own;
/// membership is narrower than the key space.
struct HomeBucketCalculator;

impl Calculator for HomeBucketCalculator {
    fn result(&self, value: &str) -> String {
        let v = value.parse::<i64>().unwrap_or(0);
        v.rem_euclid(4).to_string()
    }

    fn matches(&self, candidate: &str) -> bool {
        candidate == "1"
    }
}

#[test]
fn test_tenant_routing_with_home_bucket() {
    let details = ShardingDetails::new("0", "tenant_id", "db_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(HomeBucketCalculator));
    let config = ShardingConfig::new(&orders_table(), Some(details), None).unwrap();

    let key = config.sharding_key(ShardingAxis::Database, &row(&[("tenant_id", json!(9))]));
    assert_eq!(key, "db_1");
    assert!(config.match_key(ShardingAxis::Database, "db_1"));
    assert!(!config.match_key(ShardingAxis::Database, "db_2"));
}

#[test]
fn test_modulo_membership_covers_the_residue_space() {
    let details = ShardingDetails::new("0", "tenant_id", "db_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(ModuloCalculator::new(4)));
    let config = ShardingConfig::new(&orders_table(), Some(details), None).unwrap();

    for tenant in 0..40 {
        let key = config.sharding_key(
            ShardingAxis::Database,
            &row(&[("tenant_id", json!(tenant))]),
        );
        assert!(
            config.match_key(ShardingAxis::Database, &key),
            "computed key {key} must belong to its own table"
        );
    }
    assert!(!config.match_key(ShardingAxis::Database, "db_9"));
    assert!(!config.match_key(ShardingAxis::Database, "warehouse_1"));
}

#[test]
fn test_registry_created_calculator() {
    register_calculator("quarters", || Arc::new(ModuloCalculator::new(4)));
    let calculator = create_calculator("quarters").unwrap();
    assert_eq!(calculator.result("9"), "1");

    let details = ShardingDetails::new("0", "tenant_id", "db_{shardingKey}", ValueType::Long)
        .with_calculator_named("quarters")
        .unwrap();
    let config = ShardingConfig::new(&orders_table(), Some(details), None).unwrap();
    let key = config.sharding_key(ShardingAxis::Database, &row(&[("tenant_id", json!(6))]));
    assert_eq!(key, "db_2");
}

#[test]
fn test_unknown_calculator_name_fails() {
    assert!(create_calculator("no-such-strategy").is_err());
}

#[test]
fn test_range_calculator_bucketing() {
    let details = ShardingDetails::new("0", "id", "orders_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(RangeCalculator::new(vec![1000, 10000])));
    let config = ShardingConfig::new(&orders_table(), None, Some(details)).unwrap();

    assert_eq!(
        config.sharding_key(ShardingAxis::Table, &row(&[("id", json!(42))])),
        "orders_0"
    );
    assert_eq!(
        config.sharding_key(ShardingAxis::Table, &row(&[("id", json!(5000))])),
        "orders_1"
    );
    assert_eq!(
        config.sharding_key(ShardingAxis::Table, &row(&[("id", json!(999999))])),
        "orders_2"
    );
}

#[test]
fn test_axes_are_independent() {
    let database = ShardingDetails::new("0", "tenant_id", "db_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(ModuloCalculator::new(4)));
    let table = ShardingDetails::new("0", "id", "orders_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(ModuloCalculator::new(2)));
    let config = ShardingConfig::new(&orders_table(), Some(database), Some(table)).unwrap();

    let values = row(&[("tenant_id", json!(7)), ("id", json!(10))]);
    assert_eq!(config.sharding_key(ShardingAxis::Database, &values), "db_3");
    assert_eq!(config.sharding_key(ShardingAxis::Table, &values), "orders_0");
    // database-axis membership does not leak into the table axis
    assert!(config.match_key(ShardingAxis::Database, "db_3"));
    assert!(!config.match_key(ShardingAxis::Table, "db_3"));
}

#[test]
fn test_missing_value_falls_back_to_default() {
    let details = ShardingDetails::new("9", "tenant_id", "db_{shardingKey}", ValueType::Long)
        .with_calculator(Arc::new(ModuloCalculator::new(4)));
    let config = ShardingConfig::new(&orders_table(), Some(details), None).unwrap();
    let key = config.sharding_key(ShardingAxis::Database, &row(&[("region", json!("eu"))]));
    assert_eq!(key, "db_9");
}
