use matchd_core::config::{Config, DedupBackend};
use std::path::PathBuf;

fn write_temp_config(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("matchd-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_defaults_are_a_valid_configuration() {
    let config = Config::load(None).unwrap();
    assert_eq!(config.inbound.source, "stdin");
    assert_eq!(config.sink.timeout_seconds, 5);
    assert_eq!(config.idempotency.ttl_seconds, 3600);
    assert_eq!(config.idempotency.backend, DedupBackend::InMemory);
    assert!(config.symbols.shards >= 1);
}

#[test]
fn test_toml_file_overrides_defaults() {
    let path = write_temp_config(
        "full",
        r#"
[inbound]
source = "orders.ndjson"

[sink]
durable = ":memory:"
timeout_seconds = 2

[idempotency]
ttl_seconds = 60

[symbols]
shards = 2

[symbols.workers]
"BTC-USD" = 0
"ETH-USD" = 1
"#,
    );
    let config = Config::load(Some(&path)).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.inbound.source, "orders.ndjson");
    assert_eq!(config.sink.durable, ":memory:");
    assert_eq!(config.sink.timeout_seconds, 2);
    assert_eq!(config.idempotency.ttl_seconds, 60);
    assert_eq!(config.symbols.shards, 2);
    assert_eq!(config.symbols.workers["BTC-USD"], 0);
    assert_eq!(config.symbols.workers["ETH-USD"], 1);
}

#[test]
fn test_worker_map_must_fit_shard_count() {
    let path = write_temp_config(
        "badshard",
        r#"
[symbols]
shards = 2

[symbols.workers]
"BTC-USD" = 5
"#,
    );
    let result = Config::load(Some(&path));
    std::fs::remove_file(&path).ok();
    assert!(result.is_err(), "a route outside the shard range is fatal");
}

#[test]
fn test_external_kv_requires_endpoint() {
    let path = write_temp_config(
        "kv",
        r#"
[idempotency]
backend = "external_kv"
"#,
    );
    let result = Config::load(Some(&path));
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}
