use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tinyrest::config::{Config, StaticFilesConfig};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.max_connections, 1024);
    assert_eq!(cfg.static_files, None);
    assert_eq!(cfg.sessions.ttl(), Duration::from_secs(1800));
}

#[test]
fn test_config_env_overrides() {
    // Env vars are process-wide; every mutation stays in this one test.
    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
        std::env::set_var("WEB_ROOT", "/srv/www");
    }
    let cfg = Config::load();
    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("WEB_ROOT");
    }

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(
        cfg.static_files,
        Some(StaticFilesConfig {
            root: PathBuf::from("/srv/www")
        })
    );
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
  max_connections: 16
static_files:
  root: ./www
sessions:
  ttl_secs: 60
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9000");
    assert_eq!(cfg.server.max_connections, 16);
    assert_eq!(cfg.static_files.unwrap().root, PathBuf::from("./www"));
    assert_eq!(cfg.sessions.ttl(), Duration::from_secs(60));
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("server:\n  listen_addr: \"127.0.0.1:0\"\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:0");
    assert_eq!(cfg.server.max_connections, 1024);
    assert!(cfg.static_files.is_none());
    assert_eq!(cfg.sessions.ttl_secs, 1800);
}

#[test]
fn test_config_rejects_zero_connections() {
    let result = Config::from_yaml_str("server:\n  max_connections: 0\n");
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_connections_above_semaphore_limit() {
    let mut cfg = Config::default();
    cfg.server.max_connections = usize::MAX;
    assert!(cfg.validate().is_err());

    cfg.server.max_connections = tokio::sync::Semaphore::MAX_PERMITS;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "sessions:\n  ttl_secs: 5").unwrap();

    let cfg = Config::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.sessions.ttl_secs, 5);
}

#[test]
fn test_config_missing_file_is_error() {
    let result = Config::load_from_file(std::path::Path::new("/definitely/not/here.yaml"));
    assert!(result.is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1, cfg2);
}
