// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - flags and controller shutdown

#[cfg(test)]
mod tests {
    use crate::{controller_exit, Args};
    use cf_operator::context::Settings;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_default_flags_match_default_settings() {
        let args = Args::try_parse_from(["cf-operator"]).unwrap();
        assert_eq!(args.settings(), Settings::default());
        assert_eq!(args.metrics_port, 8080);
    }

    #[test]
    fn test_duration_flags_accept_go_style_values() {
        let args = Args::try_parse_from([
            "cf-operator",
            "--sync-interval",
            "1h30m",
            "--poll-interval",
            "500ms",
            "--service-instance-timeout",
            "15m",
            "--max-reconcile-rate",
            "10",
            "--namespace",
            "platform",
        ])
        .unwrap();

        let settings = args.settings();
        assert_eq!(settings.sync_interval, Duration::from_secs(5400));
        assert_eq!(settings.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.service_instance_timeout, Duration::from_secs(900));
        assert_eq!(settings.max_reconcile_rate, 10);
        assert_eq!(settings.namespace.as_deref(), Some("platform"));
    }

    #[test]
    fn test_invalid_duration_flag_is_rejected() {
        assert!(Args::try_parse_from(["cf-operator", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_empty_namespace_watches_everything() {
        let args = Args::try_parse_from(["cf-operator", "--namespace", ""]).unwrap();
        assert!(args.settings().namespace.is_none());
    }

    #[test]
    fn test_controller_exit_after_signal_is_clean() {
        assert!(controller_exit("Organization", Ok(())).is_ok());
        assert!(controller_exit("Organization", Err(anyhow::anyhow!("watch failed"))).is_err());
    }
}
