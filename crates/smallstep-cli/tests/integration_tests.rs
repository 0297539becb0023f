//! Integration tests for CLI commands

use std::process::Command;

/// Helper to run the CLI with a clean environment for the API settings
fn smallstep(args: &[&str]) -> std::process::Output {
    smallstep_with_env(args, &[])
}

fn smallstep_with_env(args: &[&str], env: &[(&str, &str)]) -> std::process::Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_smallstep-provider"));
    command
        .args(args)
        .env_remove("SMALLSTEP_API_URL")
        .env_remove("SMALLSTEP_API_TOKEN")
        .env_remove("SWEEP_PREFIX")
        .env_remove("SWEEP_AGE")
        .env("NO_COLOR", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute smallstep-provider")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod schema_command {
    use super::*;

    #[test]
    fn test_lists_every_type() {
        let output = smallstep(&["schema"]);
        assert!(output.status.success());
        let stdout = stdout(&output);
        for name in [
            "smallstep_authority",
            "smallstep_provisioner",
            "smallstep_collection_instance",
            "smallstep_device_collection_account",
            "smallstep_strategy",
            "smallstep_attestation_authority",
        ] {
            assert!(stdout.contains(name), "missing {name}");
        }
        assert!(stdout.contains("Data Sources"));
    }

    #[test]
    fn test_single_type_as_json() {
        let output = smallstep(&["schema", "smallstep_collection", "--json"]);
        assert!(output.status.success());
        let schema: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        assert_eq!(schema["attributes"]["slug"]["requiredness"], "required");
        assert_eq!(schema["attributes"]["instance_count"]["requiredness"], "computed");
    }

    #[test]
    fn test_short_name_is_accepted() {
        let output = smallstep(&["schema", "provisioner"]);
        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.contains("smallstep_provisioner (Resource)"));
        assert!(stdout.contains("forces replacement"));
    }

    #[test]
    fn test_data_source_prefix() {
        let output = smallstep(&["schema", "data.smallstep_authority"]);
        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.contains("(Data Source)"));
        assert!(!stdout.contains("root_issuer"));
    }

    #[test]
    fn test_unknown_type_suggests() {
        let output = smallstep(&["schema", "smallstep_authorty"]);
        assert_eq!(output.status.code(), Some(64));
        let stderr = stderr(&output);
        assert!(stderr.contains("Unknown type"), "{stderr}");
        assert!(stderr.contains("smallstep_authority"), "{stderr}");
    }
}

mod docs_command {
    use super::*;

    #[test]
    fn test_writes_one_page_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let output = smallstep(&["docs", "--output-dir", dir.path().to_str().unwrap()]);
        assert!(output.status.success(), "{}", stderr(&output));

        let resources = std::fs::read_dir(dir.path().join("resources")).unwrap().count();
        let data_sources = std::fs::read_dir(dir.path().join("data-sources")).unwrap().count();
        assert_eq!(resources, 13);
        assert_eq!(data_sources, 4);

        let page = std::fs::read_to_string(dir.path().join("resources/authority.md")).unwrap();
        assert!(page.starts_with("# smallstep_authority (Resource)"));
        assert!(page.contains("### Required"));
        assert!(page.contains("### Read-Only"));
        assert!(stdout(&output).contains("Wrote 17 files"));
    }
}

mod describe_command {
    use super::*;

    #[test]
    fn test_lists_components() {
        let output = smallstep(&["describe"]);
        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.lines().any(|l| l == "authority"));
        assert!(stdout.lines().any(|l| l == "newAuthority"));
    }

    #[test]
    fn test_inherited_properties() {
        let output = smallstep(&["describe", "newAuthority"]);
        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.contains("Properties:"));
        assert!(stdout.contains("subdomain"));
        assert!(stdout.contains("adminEmails"));
    }

    #[test]
    fn test_unknown_component() {
        let output = smallstep(&["describe", "newAuthorty"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("newAuthority"));
    }
}

mod sweep_command {
    use super::*;

    #[test]
    fn test_invalid_age() {
        let output = smallstep(&["sweep", "--age", "soon"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("sweep age"));
    }

    #[test]
    fn test_invalid_age_from_env() {
        let output = smallstep_with_env(&["sweep"], &[("SWEEP_AGE", "forever")]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_invalid_server_url() {
        let output = smallstep_with_env(&["sweep"], &[("SMALLSTEP_API_URL", "ftp://example.com")]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("ftp://example.com"));
    }

    #[test]
    fn test_include_undated_flag_is_accepted() {
        let output = smallstep_with_env(
            &["sweep", "--include-undated"],
            &[("SMALLSTEP_API_URL", "ftp://example.com")],
        );
        // parsed by clap; fails later on the server URL
        assert_eq!(output.status.code(), Some(2));
    }
}
