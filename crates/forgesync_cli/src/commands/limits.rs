use clap::ValueEnum;
use forgesync::{Connection, RateLimitSnapshot};

use crate::commands::shared::{format_duration, load_registry};
use crate::config::Config;

/// Output format for tabular commands.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Refresh and print the API quota of every configured connection.
pub(crate) async fn handle_limits(
    config: &Config,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config);

    let mut items = Vec::new();
    for conn in registry.connections() {
        let display = match conn.api().refresh_rate_limit().await {
            Ok(snapshot) => RateLimitDisplay::from_snapshot(&conn, snapshot, chrono::Utc::now()),
            Err(e) => {
                tracing::warn!(connection = %conn.identity_url(), error = %e, "Failed to fetch rate limit");
                RateLimitDisplay::unavailable(&conn, &e.to_string())
            }
        };
        items.push(display);
    }

    RateLimitDisplay::print_many(items, output)
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Connection")]
    pub connection: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_snapshot(
        conn: &Connection,
        snapshot: RateLimitSnapshot,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        if !snapshot.known {
            return Self::unavailable(conn, "not reported");
        }
        Self {
            connection: conn.identity_url().to_string(),
            remaining: snapshot.remaining.to_string(),
            reset_at: snapshot
                .reset_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            reset_in: format_duration(snapshot.reset_after(now)),
        }
    }

    fn unavailable(conn: &Connection, reason: &str) -> Self {
        Self {
            connection: conn.identity_url().to_string(),
            remaining: reason.to_string(),
            reset_at: "-".to_string(),
            reset_in: "-".to_string(),
        }
    }

    pub(crate) fn print_many(
        items: Vec<Self>,
        format: OutputFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        }
        Ok(())
    }
}
