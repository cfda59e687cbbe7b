use std::sync::Arc;

use console::style;
use forgesync::{ConnectionRegistry, ReconfigureReport};

use crate::config::Config;

/// Build a registry from `config` and report skipped entries on stderr.
pub(crate) fn load_registry(config: &Config) -> Arc<ConnectionRegistry> {
    let registry = Arc::new(ConnectionRegistry::new(config.client_settings()));
    let report = registry.reconfigure(&config.github);
    print_report_errors(&report);
    registry
}

pub(crate) fn print_report_errors(report: &ReconfigureReport) {
    for error in &report.errors {
        eprintln!("{} {}", style("Skipped connection:").yellow().bold(), error);
    }
}

/// Format a duration in a human-readable way.
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs <= 0 {
        "now".to_string()
    } else if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let (mins, secs) = (total_secs / 60, total_secs % 60);
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let (hours, mins) = (total_secs / 3600, (total_secs % 3600) / 60);
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}
