// Configuration loading tests
// Author: kelexine (https://github.com/kelexine)

use contact_relay::config::{AppConfig, ClientSource};
use contact_relay::error::RelayError;
use std::io::Write;

const BASE: &str = r#"
[server]
spreadsheet_id = "sheet-1"
google_oauth2_client = "client.json"
port = 8080
poll_rate = 500
email = "operator@example.com"
"#;

fn without_server_key(key: &str) -> String {
    let mut doc: toml::Table = BASE.parse().unwrap();
    doc.get_mut("server")
        .and_then(|server| server.as_table_mut())
        .unwrap()
        .remove(key);
    toml::to_string(&doc).unwrap()
}

#[test]
fn test_base_config_loads() {
    let config = AppConfig::from_toml_str(BASE).unwrap();
    assert_eq!(config.server.spreadsheet_id, "sheet-1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.poll_rate, 500);
    assert_eq!(config.server.client_source(), Some(ClientSource::File("client.json")));
}

#[test]
fn test_each_required_key_is_required() {
    for key in ["spreadsheet_id", "google_oauth2_client", "port", "poll_rate", "email"] {
        let toml = without_server_key(key);
        let err = AppConfig::from_toml_str(&toml).unwrap_err();
        assert_eq!(err.exit_code(), 2, "removing {} should be a config error", key);
    }
}

#[test]
fn test_missing_server_table() {
    let err = AppConfig::from_toml_str("[logging]\nlevel = \"debug\"\n").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_inline_client_fields_replace_descriptor_file() {
    let mut toml = without_server_key("google_oauth2_client");
    toml.push_str(
        "google_oauth2_auth_uri = \"https://accounts.google.com/o/oauth2/auth\"\n\
         google_oauth2_token_uri = \"https://oauth2.googleapis.com/token\"\n\
         google_oauth2_client_id = \"id.apps.googleusercontent.com\"\n\
         google_oauth2_client_secret = \"secret\"\n",
    );

    // Appending after re-serialization lands under the [server] table
    let config = AppConfig::from_toml_str(&toml).unwrap();
    assert!(matches!(
        config.server.client_source(),
        Some(ClientSource::Inline { client_id: "id.apps.googleusercontent.com", .. })
    ));
}

#[test]
fn test_zero_poll_rate_rejected() {
    let toml = BASE.replace("poll_rate = 500", "poll_rate = 0");
    assert!(matches!(
        AppConfig::from_toml_str(&toml),
        Err(RelayError::Config(_))
    ));
}

#[test]
fn test_out_of_range_port_rejected() {
    let toml = BASE.replace("port = 8080", "port = 70000");
    assert!(AppConfig::from_toml_str(&toml).is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(BASE.as_bytes()).unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.server.email, "operator@example.com");
}

#[test]
fn test_load_missing_file() {
    let err = AppConfig::load("/nonexistent/contact-relay.toml").unwrap_err();
    assert!(matches!(err, RelayError::Config(_)));
    assert!(err.to_string().contains("not found"));
}
