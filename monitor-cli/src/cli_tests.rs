//! Tests for command-line parsing

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use crate::collect::CollectMode;
    use chrono::{Duration, NaiveDate, Utc};
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("libris-monitor").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_serve_overrides() {
        let cli = parse(&[
            "--config",
            "monitor.toml",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--data",
            "lib.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("monitor.toml")));
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
                assert_eq!(args.data, Some(PathBuf::from("lib.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = parse(&["collect", "--config", "monitor.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("monitor.toml")));
    }

    #[test]
    fn test_collect_modes() {
        let mode = |args: &[&str]| match parse(args).command {
            Command::Collect(args) => CollectMode::from_args(&args),
            other => panic!("unexpected command {other:?}"),
        };

        assert_eq!(mode(&["collect"]), CollectMode::All { force: false });
        assert_eq!(mode(&["collect", "--force"]), CollectMode::All { force: true });
        assert_eq!(mode(&["collect", "--alerts"]), CollectMode::Alerts);
        assert_eq!(
            mode(&["collect", "--health-check", "--alerts"]),
            CollectMode::HealthCheck
        );
        assert_eq!(
            mode(&["collect", "--daily-stats", "--date", "2024-03-01"]),
            CollectMode::DailyStats(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(
            mode(&["collect", "--daily-stats"]),
            CollectMode::DailyStats(Utc::now().date_naive() - Duration::days(1))
        );
    }

    #[test]
    fn test_collect_rejects_bad_input() {
        let bad_date = Cli::try_parse_from([
            "libris-monitor",
            "collect",
            "--daily-stats",
            "--date",
            "yesterday",
        ]);
        assert!(bad_date.is_err());

        let date_without_stats =
            Cli::try_parse_from(["libris-monitor", "collect", "--date", "2024-03-01"]);
        assert!(date_without_stats.is_err());
    }

    #[test]
    fn test_self_test_args() {
        let cli = parse(&[
            "self-test",
            "--url",
            "http://monitor:8000",
            "--api-key",
            "lm_ops",
            "--metrics",
            "--performance",
        ]);
        match cli.command {
            Command::SelfTest(args) => {
                assert_eq!(args.url, "http://monitor:8000");
                assert_eq!(args.api_key, "lm_ops");
                assert!(args.metrics && args.performance);
                assert!(!args.all && !args.endpoints && !args.alerts);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Cli::try_parse_from(["libris-monitor", "migrate"]).is_err());
    }
}
