//! Suite and configuration files read from disk

use std::fs;

use tempfile::TempDir;

use webcheck::common::config::Config;
use webcheck::testing::{load_suite, Command};
use webcheck::webdriver::BrowserProfile;
use webcheck::Error;

#[test]
fn test_yaml_suite_name_defaults_to_file_stem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nightly.yml");
    fs::write(
        &path,
        r#"
cases:
  - id: HR
    url: https://hr.example.com
    browser: ChromeIncognito
    debug: 1
    steps:
      - command: Open
        enabled: 1
        url: https://hr.example.com
        owner: platform-team
"#,
    )
    .unwrap();

    let suite = load_suite(&path).unwrap();
    assert_eq!(suite.name.as_deref(), Some("nightly"));

    let case = &suite.cases[0];
    assert_eq!(case.display_name(), "HR");
    assert_eq!(case.profile(), BrowserProfile::ChromeIncognito);
    assert!(case.debug);

    let step = &case.steps[0];
    assert!(step.enabled);
    assert_eq!(step.param("owner").as_deref(), Some("platform-team"));
    assert!(matches!(Command::from_step(step), Ok(Command::Open { .. })));
}

#[test]
fn test_json_suite_keeps_declared_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.JSON");
    fs::write(
        &path,
        r#"{
  "name": "payroll",
  "cases": [
    {
      "ITEM_ID": "PAY",
      "ITEM_NAME": "Payroll",
      "URL": "https://pay.example.com/health",
      "SERVER": "APP01",
      "TESTS": [
        {"command": "Open", "enabled": 1, "url": "https://pay.example.com/health"},
        {"command": "HealthCheck", "enabled": 0, "key": "status", "value": "Healthy"}
      ]
    }
  ]
}"#,
    )
    .unwrap();

    let suite = load_suite(&path).unwrap();
    assert_eq!(suite.name.as_deref(), Some("payroll"));

    let case = &suite.cases[0];
    assert_eq!(case.display_name(), "Payroll");
    assert_eq!(case.server.as_deref(), Some("APP01"));
    assert_eq!(case.profile(), BrowserProfile::Firefox);
    assert_eq!(case.declared_count(), 1);

    match Command::from_step(&case.steps[1]).unwrap() {
        Command::HealthCheck { key, expected } => {
            assert_eq!(key, "status");
            assert_eq!(expected.as_deref(), Some("Healthy"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_malformed_suite_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "cases: [ {id: X").unwrap();

    match load_suite(&path) {
        Err(Error::Config(message)) => assert!(message.contains("broken.yaml")),
        other => panic!("expected a config error, got {:?}", other.map(|s| s.name)),
    }
}

#[test]
fn test_missing_suite_is_file_read_error() {
    let dir = TempDir::new().unwrap();
    let result = load_suite(&dir.path().join("nope.yaml"));
    assert!(matches!(result, Err(Error::FileRead { .. })));
}

#[test]
fn test_config_file_overrides_only_named_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[hub]
protocol = "https"
host = "grid.internal"
port = 443

[navigation]
sso_hosts = ["sso.example.com", "login.microsoftonline.com"]

[report]
screenshot_always = true
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.hub.webdriver_url(), "https://grid.internal:443/wd/hub");
    assert_eq!(config.navigation.sso_hosts.len(), 2);
    assert!(config.report.screenshot_always);
    assert_eq!(config.timeouts.page_load_secs, 30);
    assert_eq!(config.navigation.toast_class, "toast-message");
}

#[test]
fn test_config_with_wrong_types_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[timeouts]\npage_load_secs = \"soon\"\n").unwrap();

    assert!(matches!(Config::load_from(&path), Err(Error::ConfigParse(_))));
}
