//! Tests for configuration loading

#[cfg(test)]
mod tests {
    use crate::CliError;
    use crate::config::*;
    use libris_monitor_core::ComparisonOperator;
    use std::io::Write;
    use std::path::PathBuf;

    const FULL_CONFIG: &str = r#"
[logging]
level = "debug"
format = "json"
output = "stderr"

[server]
bind = "0.0.0.0:9100"
environment = "production"

[monitoring]
activity_window_days = 14
probe_timeout_ms = 1500

[monitoring.cache]
metrics_ttl_secs = 120

[[monitoring.alerting.rules]]
name = "many_overdue"
metric = "overdue_loans"
operator = "greater_than_or_equal"
limit = 25.0
severity = "warning"
category = "business_logic"
section = "loans"

[auth]
jwt_secret = "s3cret"
jwt_issuer = "libris-prod"

[[auth.api_keys]]
key = "lm_ops"
user = "ops"
roles = ["admin"]

[data]
path = "/var/lib/libris/library.json"
"#;

    #[test]
    fn test_default_logging_config() {
        let config = DefaultLoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.output, LogOutput::Stdout);
    }

    #[test]
    fn test_log_format_serialization() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        assert_eq!(
            serde_json::to_string(&LogFormat::Compact).unwrap(),
            "\"compact\""
        );
        assert_eq!(
            serde_json::to_string(&LogOutput::Stderr).unwrap(),
            "\"stderr\""
        );
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load_or_default(None).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.server.environment, "development");
        assert_eq!(config.data.path, PathBuf::from("library.json"));
        assert_eq!(
            config.auth.admin_roles,
            vec!["super_admin", "librarian", "admin"]
        );
        assert_eq!(config.monitoring.exporter.scrape_interval_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, LogOutput::Stderr);
        assert_eq!(config.server.bind, "0.0.0.0:9100");
        assert_eq!(config.server.environment, "production");
        assert_eq!(config.monitoring.activity_window_days, 14);
        assert_eq!(config.monitoring.cache.metrics_ttl_secs, 120);
        assert_eq!(config.monitoring.cache.stats_ttl_secs, 3600);

        let rules = &config.monitoring.alerting.rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].operator, ComparisonOperator::GreaterThanOrEqual);

        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.jwt_issuer, "libris-prod");
        assert_eq!(config.auth.jwt_audience, "libris-monitor");
        assert_eq!(config.auth.api_keys[0].user, "ops");
        assert_eq!(
            config.data.path,
            PathBuf::from("/var/lib/libris/library.json")
        );
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = AppConfig::from_toml_str("[server]\nenvironment = \"staging\"\n").unwrap();
        assert_eq!(config.server.environment, "staging");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.monitoring.alerting.rules.len(), 4);
    }

    #[test]
    fn test_invalid_monitoring_values_rejected() {
        let err =
            AppConfig::from_toml_str("[monitoring.cache]\nhealth_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, CliError::Monitor(_)));

        let err = AppConfig::from_toml_str("[monitoring]\nprobe_timeout_ms = 5000\n").unwrap_err();
        assert!(matches!(err, CliError::Monitor(_)));
    }

    #[test]
    fn test_invalid_auth_values_rejected() {
        let err = AppConfig::from_toml_str("[auth]\nadmin_roles = []\n").unwrap_err();
        assert!(matches!(err, CliError::Configuration(_)));

        let err = AppConfig::from_toml_str(
            "[[auth.api_keys]]\nkey = \"\"\nuser = \"ops\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("ops"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[server\nbind = 1").unwrap_err();
        assert!(matches!(err, CliError::Toml(_)));

        let err = AppConfig::from_toml_str("[logging]\nformat = \"fancy\"\n").unwrap_err();
        assert!(matches!(err, CliError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CliError::Configuration(_)));
    }
}
