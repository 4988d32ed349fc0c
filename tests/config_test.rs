use blueprint_forge::config::{EngineConfig, Settings, StorageConfig};
use std::io::Write;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.server.listen_addr.to_string(), "127.0.0.1:8080");
    assert!(settings.server.enable_cors);
    assert_eq!(settings.engine, EngineConfig::default());
    assert_eq!(settings.storage, StorageConfig::Memory);
    assert_eq!(settings.logging.level, "info");
    assert!(!settings.logging.json);
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let settings = Settings::from_yaml_str(
        r#"
server:
  listen_addr: "0.0.0.0:9000"
engine:
  node_timeout_secs: 5
logging:
  json: true
"#,
    )
    .expect("valid settings");

    assert_eq!(settings.server.listen_addr.port(), 9000);
    assert!(settings.server.enable_cors);
    assert_eq!(settings.engine.node_timeout_secs, 5);
    assert_eq!(settings.engine.template_max_depth, EngineConfig::default().template_max_depth);
    assert!(settings.logging.json);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn test_redis_storage() {
    let settings = Settings::from_yaml_str(
        r#"
storage:
  type: redis
  url: redis://127.0.0.1:6379
"#,
    )
    .expect("valid settings");

    assert_eq!(
        settings.storage,
        StorageConfig::Redis {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "bpforge".to_string(),
        }
    );
    // Opening only parses the url; no connection is made yet.
    assert!(settings.storage.open().is_ok());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("tempfile");
    writeln!(file, "server:\n  enable_cors: false").expect("write");

    let settings = Settings::load(file.path()).expect("load");
    assert!(!settings.server.enable_cors);

    assert!(Settings::load_or_default(None).is_ok());
    assert!(Settings::load("/no/such/settings.yaml").is_err());
}

#[test]
fn test_invalid_settings_rejected() {
    assert!(Settings::from_yaml_str("server:\n  listen_addr: not-an-address").is_err());
    assert!(Settings::from_yaml_str("storage:\n  type: etcd").is_err());
}
