use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Upstream endpoints that are never contacted while the queue is empty.
const UPSTREAM: &str = r#"
[scheduler]
enabled = false

[upstream.article]
url = "http://127.0.0.1:9"

[upstream.creative]
url = "http://127.0.0.1:9"

[upstream.performance]
url = "http://127.0.0.1:9"
"#;

/// Create a minimal valid config
fn minimal_config(port: u16) -> String {
    format!(
        r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = {}
{}"#,
        port, UPSTREAM
    )
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path, db_dir: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_launchpro"))
        .env("LAUNCHPRO_CONFIG", config_path)
        .env("LAUNCHPRO_DATABASE__PATH", db_dir.join("launchpro.db"))
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn run_binary(config_path: &std::path::Path) -> std::process::Output {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_launchpro"))
            .env("LAUNCHPRO_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let db_dir = tempfile::TempDir::new().unwrap();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(minimal_config(port).as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path(), db_dir.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let db_dir = tempfile::TempDir::new().unwrap();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(minimal_config(port).as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path(), db_dir.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["auth"]["method"], "none");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["upstream"]["article"]["api_key_configured"], false);
    // Tracking falls back to the article service.
    assert_eq!(json["upstream"]["tracking"]["url"], "http://127.0.0.1:9");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_binary(std::path::Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_auth_section_exits_with_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(format!("[server]\nport = 8080\n{}", UPSTREAM).as_bytes())
        .unwrap();
    temp_file.flush().unwrap();

    let result = run_binary(temp_file.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_upstream_section_exits_with_error() {
    let db_dir = tempfile::TempDir::new().unwrap();
    let config = format!(
        r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        get_available_port(),
        db_dir.path().join("launchpro.db").display()
    );

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let result = run_binary(temp_file.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_startup_is_audited_and_persisted() {
    let db_dir = tempfile::TempDir::new().unwrap();

    for _ in 0..2 {
        let port = get_available_port();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(minimal_config(port).as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let mut server = spawn_server(temp_file.path(), db_dir.path()).await;
        assert!(
            wait_for_server(port, 40).await,
            "Server did not start in time"
        );
        // Give the audit writer a moment to write the event
        sleep(Duration::from_millis(100)).await;

        let json: serde_json::Value = Client::new()
            .get(format!(
                "http://127.0.0.1:{}/api/v1/audit?event_type=service_started",
                port
            ))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        let event = &json["events"][0];
        assert!(event["data"]["version"].is_string());
        assert!(event["data"]["config_hash"].is_string());

        server.kill().await.ok();
        sleep(Duration::from_millis(100)).await;
    }

    assert!(db_dir.path().join("launchpro.db").exists());

    // Both starts share the database file.
    let port = get_available_port();
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(minimal_config(port).as_bytes()).unwrap();
    temp_file.flush().unwrap();
    let mut server = spawn_server(temp_file.path(), db_dir.path()).await;
    assert!(wait_for_server(port, 40).await);
    sleep(Duration::from_millis(100)).await;

    let json: serde_json::Value = Client::new()
        .get(format!(
            "http://127.0.0.1:{}/api/v1/audit?event_type=service_started",
            port
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(json["total"].as_i64().unwrap() >= 3);

    server.kill().await.ok();
}
