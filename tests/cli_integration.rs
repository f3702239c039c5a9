//! CLI integration tests
//!
//! These run the compiled binary and check:
//! - Command parsing and help output
//! - Files written by `scaffold` and `terraform`
//! - Exit codes

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to get the path to the gepp binary
fn gepp_bin() -> PathBuf {
    // In tests, the binary should be at target/debug/gepp
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("gepp")
}

/// Runs gepp in `dir` with an environment that cannot leak in from the host
fn gepp(dir: &Path, args: &[&str]) -> Output {
    Command::new(gepp_bin())
        .args(args)
        .current_dir(dir)
        .env("PROJECT_NAME", "demo")
        .env_remove("GEPP_LOG_LEVEL")
        .env_remove("GEPP_MANIFEST_DIR")
        .env_remove("GEPP_KUBECONFIG")
        .output()
        .expect("Failed to execute gepp")
}

fn python_project() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("main.py"), "print('hello')\n").expect("Failed to write main.py");
    dir
}

#[test]
fn test_cli_help() {
    let output = Command::new(gepp_bin())
        .arg("--help")
        .output()
        .expect("Failed to execute gepp");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gepp"));
    for command in ["up", "scaffold", "ports", "terraform"] {
        assert!(stdout.contains(command), "help lacks '{}'", command);
    }
}

#[test]
fn test_cli_version() {
    let output = Command::new(gepp_bin())
        .arg("--version")
        .output()
        .expect("Failed to execute gepp");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gepp"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_scaffold_writes_files() {
    let dir = python_project();

    let output = gepp(dir.path(), &["scaffold"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("Dockerfile").is_file());
    assert!(dir.path().join(".dockerignore").is_file());
    assert!(dir.path().join("kubernetes/deployment-demo.yaml").is_file());
    assert!(dir.path().join("kubernetes/hp-autoscaler-demo.yaml").is_file());
    // Scaffolding never touches the cluster or writes the Terraform stack
    assert!(!dir.path().join("kubeconfig").exists());
    assert!(!dir.path().join("cdktf.out").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Done!"));
}

#[test]
fn test_scaffold_keeps_existing_dockerfile() {
    let dir = python_project();
    let custom = "FROM scratch\n";
    fs::write(dir.path().join("Dockerfile"), custom).unwrap();

    let output = gepp(dir.path(), &["-q", "scaffold", "."]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("Dockerfile")).unwrap(), custom);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_scaffold_without_entrypoint_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let output = gepp(dir.path(), &["scaffold"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("Dockerfile").exists());
    assert!(!dir.path().join("kubernetes").exists());
}

#[test]
fn test_nonexistent_project_dir() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let output = gepp(dir.path(), &["scaffold", "/nonexistent/path/12345"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_terraform_writes_stack() {
    let dir = python_project();

    let output = gepp(
        dir.path(),
        &["terraform", "--location", "West Europe", "--cluster-name", "demo-aks"],
    );

    assert!(output.status.success());
    let stack_path = dir.path().join("cdktf.out/stacks/demo/cdk.tf.json");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cdk.tf.json"));

    let stack: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(stack_path).unwrap()).unwrap();
    assert_eq!(
        stack["variable"]["cluster_location"]["default"],
        "West Europe"
    );
    assert_eq!(
        stack["resource"]["azurerm_kubernetes_cluster"]["demo-aks"]["name"],
        "demo-aks"
    );
}

#[test]
fn test_invalid_timeout_falls_back_to_default() {
    let dir = python_project();

    let output = Command::new(gepp_bin())
        .arg("scaffold")
        .current_dir(dir.path())
        .env("PROJECT_NAME", "demo")
        .env("GEPP_COMMAND_TIMEOUT", "0")
        .output()
        .expect("Failed to execute gepp");

    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("Dockerfile").is_file());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEPP_COMMAND_TIMEOUT"));
}

#[test]
fn test_invalid_log_level_still_scaffolds() {
    let dir = python_project();

    let output = Command::new(gepp_bin())
        .arg("scaffold")
        .current_dir(dir.path())
        .env("PROJECT_NAME", "demo")
        .env("GEPP_LOG_LEVEL", "chatty")
        .output()
        .expect("Failed to execute gepp");

    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("Dockerfile").is_file());
    assert!(dir.path().join(".dockerignore").is_file());
    assert!(dir.path().join("kubernetes/deployment-demo.yaml").is_file());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Done!"));
}

/// Runs `gepp up` with neither a Docker daemon nor a k3d binary reachable
fn offline_up(dir: &Path, args: &[&str]) -> Output {
    Command::new(gepp_bin())
        .arg("up")
        .args(args)
        .current_dir(dir)
        .env("PROJECT_NAME", "demo")
        .env("DOCKER_HOST", "unix:///nonexistent/gepp-docker.sock")
        .env("GEPP_K3D_BIN", "/nonexistent/k3d")
        .env("GEPP_COMMAND_TIMEOUT", "20")
        .env_remove("GEPP_LOG_LEVEL")
        .env_remove("GEPP_MANIFEST_DIR")
        .env_remove("GEPP_KUBECONFIG")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute gepp")
}

#[test]
fn test_up_without_docker_or_k3d_prints_summary() {
    let dir = python_project();

    let output = offline_up(dir.path(), &[]);

    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("🔎 Looking up ingress ports"));
    assert!(stdout.contains("Stages:\n"));
    assert!(stdout.contains("entrypoint   completed\n"));
    assert!(stdout.contains("Exit code: 0\n"));
    assert!(dir.path().join("cdktf.out/stacks/demo/cdk.tf.json").is_file());
}

#[test]
fn test_interactive_prompts_stay_off_stdout() {
    let dir = python_project();

    let output = offline_up(dir.path(), &["--interactive"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains("Application name"));
    assert!(stderr.contains("Application name [demo]: "));
    assert!(stdout.contains("Done! ✅"));
}

#[test]
fn test_unknown_subcommand() {
    let output = Command::new(gepp_bin())
        .arg("destroy")
        .output()
        .expect("Failed to execute gepp");

    assert!(!output.status.success());
}
