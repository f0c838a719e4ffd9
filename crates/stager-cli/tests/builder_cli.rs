//! Exit status and status lines of the `builder` binary.

use std::path::Path;
use std::process::{Command, Output};

fn builder(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_builder"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// An existing file standing in for the daemon executable.
fn daemon_placeholder(dir: &Path) -> String {
    let path = dir.join("docker");
    std::fs::write(&path, "").unwrap();
    path.display().to_string()
}

#[test]
fn test_help_exits_zero() {
    let output = builder(&["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("dockerRef"));
}

#[test]
fn test_unknown_flag_exits_one() {
    let output = builder(&["-noSuchFlag", "x"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_missing_locator_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_placeholder(dir.path());

    let output = builder(&["-dockerDaemonExecutablePath", &daemon]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("dockerImageURL or dockerRef required"));
}

#[test]
fn test_registry_with_scheme_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_placeholder(dir.path());

    let output = builder(&[
        "-dockerRef",
        "ubuntu:22.04",
        "-insecureDockerRegistries",
        "http://10.0.0.1:5000",
        "-dockerDaemonExecutablePath",
        &daemon,
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("no scheme allowed for insecure Docker Registry"));
}

#[test]
fn test_missing_daemon_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-docker");

    let output = builder(&[
        "-dockerRef",
        "ubuntu:22.04",
        "-dockerDaemonExecutablePath",
        &missing.display().to_string(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("docker daemon not found"));
}

#[cfg(unix)]
mod staging {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn fake_docker(dir: &Path, daemon_body: &str) -> PathBuf {
        let path = dir.join("docker");
        let script = format!(
            concat!(
                "#!/bin/sh\n",
                "case \"$1\" in\n",
                "  -d) {daemon} ;;\n",
                "  pull) exit 0 ;;\n",
                "  inspect) echo '{{\"Cmd\":[\"./run\"],\"WorkingDir\":\"/app\"}}' ;;\n",
                "  *) exit 1 ;;\n",
                "esac\n",
            ),
            daemon = daemon_body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn stage_with(dir: &Path, docker: &Path) -> Output {
        let socket = dir.join("docker.sock");
        let output = dir.join("result").join("result.json");

        builder(&[
            "-dockerRef",
            "registry.example.com/scope/repo:v2",
            "-dockerDaemonExecutablePath",
            &docker.display().to_string(),
            "-dockerDaemonSocketPath",
            &socket.display().to_string(),
            "-outputMetadataJSONFilename",
            &output.display().to_string(),
            "-shutdownGracePeriod",
            "5",
        ])
    }

    #[test]
    fn test_successful_staging_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let docker = fake_docker(
            dir.path(),
            &format!("touch '{}'; exec sleep 30", socket.display()),
        );

        let output = stage_with(dir.path(), &docker);

        assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("Staging process started ..."));
        assert!(out.contains("Staging process finished"));

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("result").join("result.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["detected_start_command"]["web"], "./run");
    }

    #[test]
    fn test_daemon_crash_exits_two() {
        let dir = tempfile::tempdir().unwrap();
        let docker = fake_docker(dir.path(), "exit 1");

        let output = stage_with(dir.path(), &docker);

        assert_eq!(output.status.code(), Some(2));
        assert!(stdout(&output).contains("Staging process started ..."));
        assert!(!stdout(&output).contains("Staging process finished"));
        assert!(stderr(&output).contains("Staging process failed: docker_daemon"));
    }
}
