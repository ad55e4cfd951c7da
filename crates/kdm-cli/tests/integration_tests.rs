//! Integration tests for CLI commands

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST: &str = r#"releases:
  - version: v1.32.9+rke2r1
    minChannelServerVersion: v2.11.0-alpha1
    maxChannelServerVersion: v2.11.99
    charts: &charts-v1-32-9-rke2r1
      rke2-canal:
        repo: rancher-rke2-charts
        version: v3.29.0
    serverArgs: &serverArgs-v1-32-9-rke2r1
      cni:
        type: string
        default: canal
    agentArgs: &agentArgs-v1-32-9-rke2r1
      node-label:
        type: array
  - version: v1.33.1+rke2r1
    minChannelServerVersion: v2.12.0-alpha1
    maxChannelServerVersion: v2.12.99
    charts: &charts-v1-33-1-rke2r1
      <<: *charts-v1-32-9-rke2r1
      rke2-coredns:
        repo: rancher-rke2-charts
        version: 1.41.0
    serverArgs: *serverArgs-v1-32-9-rke2r1
    agentArgs: *agentArgs-v1-32-9-rke2r1
"#;

const R1_CHARTS: &str = r#"charts:
  - version: v3.29.0
    filename: /charts/rke2-canal.yaml
  - version: 1.41.0
    filename: /charts/rke2-coredns.yaml
"#;

const R2_CHARTS: &str = r#"charts:
  - version: v3.30.0
    filename: /charts/rke2-canal.yaml
  - version: 1.41.0
    filename: /charts/rke2-coredns.yaml
"#;

/// Workspace with a manifest and a config pointing at the mock server
struct Fixture {
    _dir: TempDir,
    manifest: PathBuf,
    config: PathBuf,
}

impl Fixture {
    fn new(server_uri: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("channels-rke2.yaml");
        std::fs::write(&manifest, MANIFEST).unwrap();

        let config = dir.path().join("config.yaml");
        std::fs::write(
            &config,
            format!(
                "urlTemplate: {}/rancher/{{product}}/{{ref}}/charts/chart_versions.yaml\ntokenEnv: null\n",
                server_uri
            ),
        )
        .unwrap();

        Self {
            _dir: dir,
            manifest,
            config,
        }
    }

    fn manifest_text(&self) -> String {
        std::fs::read_to_string(&self.manifest).unwrap()
    }
}

/// Run kdm off the async executor so the mock server keeps serving
async fn kdm(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_kdm"))
            .args(&args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute kdm")
    })
    .await
    .unwrap()
}

fn args(fixture: &Fixture, rest: &[&str]) -> Vec<String> {
    let mut args: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
    args.push("--config".to_string());
    args.push(path_arg(&fixture.config));
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn chart_server() -> MockServer {
    let server = MockServer::start().await;
    for (release, body) in [("v1.33.1+rke2r1", R1_CHARTS), ("v1.33.2+rke2r1", R2_CHARTS)] {
        Mock::given(method("GET"))
            .and(path(format!(
                "/rancher/rke2/{}/charts/chart_versions.yaml",
                release
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }
    server
}

mod channels_command {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_adds_release_to_manifest() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());
        let manifest = path_arg(&fixture.manifest);

        let output = kdm(args(
            &fixture,
            &["channels", "--file", &manifest, "--release", "v1.33.2+rke2r1"],
        ))
        .await;

        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Added v1.33.2+rke2r1 after v1.33.1+rke2r1"));

        let updated = fixture.manifest_text();
        assert!(updated.starts_with(MANIFEST));
        assert_eq!(
            &updated[MANIFEST.len()..],
            "  - version: v1.33.2+rke2r1
    minChannelServerVersion: v2.12.0-alpha1
    maxChannelServerVersion: v2.12.99
    charts: &charts-v1-33-2-rke2r1
      <<: *charts-v1-33-1-rke2r1
      rke2-canal:
        repo: rancher-rke2-charts
        version: v3.30.0
    serverArgs: &serverArgs-v1-33-2-rke2r1
      <<: *serverArgs-v1-32-9-rke2r1
    agentArgs: &agentArgs-v1-33-2-rke2r1
      <<: *agentArgs-v1-32-9-rke2r1
"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dry_run_prints_without_writing() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());
        let manifest = path_arg(&fixture.manifest);

        let output = kdm(args(
            &fixture,
            &[
                "channels",
                "--file",
                &manifest,
                "--release",
                "v1.33.2+rke2r1",
                "--dry-run",
            ],
        ))
        .await;

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with(MANIFEST));
        assert!(stdout.contains("  - version: v1.33.2+rke2r1\n"));
        assert_eq!(fixture.manifest_text(), MANIFEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_version_exits_with_input_error() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());
        let manifest = path_arg(&fixture.manifest);

        let output = kdm(args(
            &fixture,
            &["channels", "--file", &manifest, "--release", "1.33.2-rke2r1"],
        ))
        .await;

        assert_eq!(output.status.code(), Some(2));
        assert_eq!(fixture.manifest_text(), MANIFEST);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_predecessor_leaves_manifest_untouched() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());
        let manifest = path_arg(&fixture.manifest);

        // the first release is fine, the second needs v1.33.4+rke2r1
        let output = kdm(args(
            &fixture,
            &[
                "channels",
                "--file",
                &manifest,
                "--release",
                "v1.33.2+rke2r1,v1.33.5+rke2r1",
            ],
        ))
        .await;

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("v1.33.4+rke2r1"));
        assert_eq!(fixture.manifest_text(), MANIFEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_chart_list_exits_with_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let fixture = Fixture::new(&server.uri());
        let manifest = path_arg(&fixture.manifest);

        let output = kdm(args(
            &fixture,
            &["channels", "--file", &manifest, "--release", "v1.33.2+rke2r1"],
        ))
        .await;

        assert_eq!(output.status.code(), Some(6));
        assert_eq!(fixture.manifest_text(), MANIFEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_manifest_exits_with_io_error() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());

        let output = kdm(args(
            &fixture,
            &[
                "channels",
                "--file",
                "/nonexistent/channels-rke2.yaml",
                "--release",
                "v1.33.2+rke2r1",
            ],
        ))
        .await;

        assert_eq!(output.status.code(), Some(5));
    }
}

mod charts_command {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prints_changed_charts() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());

        let output = kdm(args(
            &fixture,
            &["charts", "v1.33.2+rke2r1", "--previous", "v1.33.1+rke2r1"],
        ))
        .await;

        assert!(output.status.success());
        insta::assert_snapshot!(String::from_utf8_lossy(&output.stdout), @r"
        rke2-canal:
          repo: rancher-rke2-charts
          version: v3.30.0
        ");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_resolves_previous_release() {
        let server = chart_server().await;
        let fixture = Fixture::new(&server.uri());

        let output = kdm(args(&fixture, &["charts", "v1.33.2+rke2r1"])).await;

        assert!(output.status.success());
        let requested: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert!(requested.iter().any(|p| p.contains("v1.33.1+rke2r1")));
    }
}

mod predecessor_command {
    use super::*;

    fn predecessor(fixture: &Fixture, release: &str) -> Output {
        Command::new(env!("CARGO_BIN_EXE_kdm"))
            .args(["predecessor", release, "--file"])
            .arg(&fixture.manifest)
            .output()
            .expect("Failed to execute kdm")
    }

    #[test]
    fn test_previous_patch() {
        let fixture = Fixture::new("http://127.0.0.1:9");
        let output = predecessor(&fixture, "v1.33.2+rke2r1");

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "v1.33.1+rke2r1\n");
    }

    #[test]
    fn test_minor_rollover_uses_manifest_history() {
        let fixture = Fixture::new("http://127.0.0.1:9");
        let output = predecessor(&fixture, "v1.34.0+rke2r1");

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "v1.33.1+rke2r1\n");
    }

    #[test]
    fn test_no_predecessor() {
        let fixture = Fixture::new("http://127.0.0.1:9");
        let output = predecessor(&fixture, "v1.36.0+rke2r1");

        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_unrecorded_predecessor_warns() {
        let fixture = Fixture::new("http://127.0.0.1:9");
        let output = predecessor(&fixture, "v1.33.4+rke2r1");

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "v1.33.3+rke2r1\n");
        assert!(String::from_utf8_lossy(&output.stderr).contains("not recorded"));
    }

    #[test]
    fn test_malformed_version() {
        let fixture = Fixture::new("http://127.0.0.1:9");
        let output = predecessor(&fixture, "v1.33+rke2r1");

        assert_eq!(output.status.code(), Some(2));
    }
}
