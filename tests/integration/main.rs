//! Integration tests for Bakery

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn bakery() -> Command {
        cargo_bin_cmd!("bakery")
    }

    /// A manifest directory with one distributable and one transient image
    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("toolbox")).unwrap();
        fs::write(
            dir.path().join("toolbox/Containerfile.base"),
            "FROM quay.io/fedora/fedora:${FEDORA_VERSION} AS base\nFROM base\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("toolbox/Containerfile.fetcher"),
            "FROM scratch\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("bakery.toml"),
            r#"
repo = "https://github.com/acme/containerfiles"

[[batch]]
name = "toolbox"

[[batch.image]]
containerfile = "toolbox/Containerfile.fetcher"
pushspecs = ["localhost/fetcher:latest"]
transient = true

[[batch.image]]
containerfile = "toolbox/Containerfile.base"
pushspecs = ["quay.io/acme/toolbox:base-fedora-40"]

[batch.image.build_args]
FEDORA_VERSION = "40"
"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn help_displays() {
        bakery()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("batch container image builder"));
    }

    #[test]
    fn version_displays() {
        bakery()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bakery"));
    }

    #[test]
    fn validate_only_announces_plan() {
        let dir = fixture();
        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--validate-only",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Containerfile.base")
                    .and(predicate::str::contains(
                        "quay.io/acme/toolbox:base-fedora-40",
                    ))
                    .and(predicate::str::contains("quay.io/fedora/fedora:40"))
                    .and(predicate::str::contains("Is transient: true")),
            );
    }

    #[test]
    fn missing_containerfile_fails_validation() {
        let dir = fixture();
        fs::remove_file(dir.path().join("toolbox/Containerfile.base")).unwrap();

        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--validate-only",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Missing containerfile"));
    }

    #[test]
    fn missing_manifest_fails() {
        bakery()
            .args(["--manifest", "/nonexistent/bakery.toml", "--validate-only"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Manifest not found"));
    }

    #[test]
    fn authfile_conflicts_with_push_only() {
        bakery()
            .args(["--authfile", "/tmp/auth.json", "--push-only"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used with"));
    }

    #[test]
    fn missing_authfile_fails_before_any_work() {
        let dir = fixture();
        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--authfile",
                dir.path().join("nonexistent-auth.json").to_str().unwrap(),
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Authfile not found"));
    }

    /// The fixture with a version-tracked package and a pre-seeded cache
    /// file, as a retried run would find it
    fn seeded_fixture() -> TempDir {
        let dir = fixture();
        let manifest = fs::read_to_string(dir.path().join("bakery.toml")).unwrap();
        fs::write(
            dir.path().join("bakery.toml"),
            format!("{manifest}\n[versions]\nYQ_VERSION = \"mikefarah/yq\"\n"),
        )
        .unwrap();
        fs::create_dir(dir.path().join(".bakery-cache")).unwrap();
        fs::write(
            dir.path().join(".bakery-cache/YQ_VERSION.json"),
            r#"{"name":"YQ_VERSION","org_and_repo":"mikefarah/yq","commit":null,"latest_tag":"v4.44.1"}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn cache_deleted_after_successful_run() {
        let dir = seeded_fixture();
        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--skip-release-check",
                "--validate-only",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .success();

        assert!(!dir.path().join(".bakery-cache/YQ_VERSION.json").exists());
    }

    #[test]
    fn keep_version_cache_retains_files() {
        let dir = seeded_fixture();
        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--skip-release-check",
                "--validate-only",
                "--keep-version-cache",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .success();

        assert!(dir.path().join(".bakery-cache/YQ_VERSION.json").exists());
    }

    #[test]
    fn failed_run_retains_cache_for_retry() {
        let dir = seeded_fixture();
        fs::remove_file(dir.path().join("toolbox/Containerfile.base")).unwrap();

        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--skip-release-check",
                "--validate-only",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .failure();

        assert!(dir.path().join(".bakery-cache/YQ_VERSION.json").exists());
    }

    #[test]
    fn validate_only_leaves_no_cache_behind() {
        let dir = fixture();
        bakery()
            .args([
                "--manifest",
                dir.path().join("bakery.toml").to_str().unwrap(),
                "--validate-only",
            ])
            .env("GITHUB_SHA", "feedface")
            .assert()
            .success();

        // no tracked packages in this manifest, so nothing was cached
        let cache_dir = dir.path().join(".bakery-cache");
        assert!(!cache_dir.exists() || fs::read_dir(cache_dir).unwrap().next().is_none());
    }
}
