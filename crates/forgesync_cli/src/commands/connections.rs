use forgesync::{CloneUrlStyle, Connection};

use crate::commands::limits::OutputFormat;
use crate::commands::shared::load_registry;
use crate::config::Config;

/// Print the connections the current configuration yields.
pub(crate) fn handle_connections(
    config: &Config,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(config);
    let items: Vec<_> = registry
        .connections()
        .iter()
        .map(|conn| ConnectionDisplay::from_connection(conn))
        .collect();

    match output {
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

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct ConnectionDisplay {
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "API")]
    pub api_endpoint: String,
    #[tabled(rename = "Token")]
    pub authenticated: bool,
    #[tabled(rename = "Queries")]
    pub repository_query: String,
    #[tabled(rename = "Repos")]
    pub explicit_repos: usize,
    #[tabled(rename = "Path Pattern")]
    pub path_pattern: String,
    #[tabled(rename = "Enabled")]
    pub initial_enablement: bool,
    #[tabled(rename = "Clone URLs")]
    pub clone_urls: &'static str,
}

impl ConnectionDisplay {
    fn from_connection(conn: &Connection) -> Self {
        Self {
            url: conn.identity_url().to_string(),
            api_endpoint: conn.api_endpoint().to_string(),
            authenticated: conn.has_token(),
            repository_query: conn.repository_query().join(", "),
            explicit_repos: conn.explicit_repos().len(),
            path_pattern: conn.path_pattern().to_string(),
            initial_enablement: conn.initial_enablement(),
            clone_urls: match conn.clone_url_style() {
                CloneUrlStyle::Http => "https",
                CloneUrlStyle::Ssh => "ssh",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use forgesync::ConnectionConfig;

    use super::*;

    #[test]
    fn display_applies_connection_defaults() {
        let config = Config {
            github: vec![ConnectionConfig {
                token: Some("t".to_string()),
                git_url_type: CloneUrlStyle::Ssh,
                ..ConnectionConfig::new("https://GHE.example.com/")
            }],
            ..Config::default()
        };
        let registry = load_registry(&config);
        let items: Vec<_> = registry
            .connections()
            .iter()
            .map(|conn| ConnectionDisplay::from_connection(conn))
            .collect();

        assert_eq!(items.len(), 2);
        let ghe = &items[0];
        assert_eq!(ghe.url, "https://ghe.example.com");
        assert_eq!(ghe.api_endpoint, "https://ghe.example.com/api");
        assert!(ghe.authenticated);
        assert_eq!(ghe.repository_query, "public, affiliated");
        assert_eq!(ghe.path_pattern, "{host}/{nameWithOwner}");
        assert_eq!(ghe.clone_urls, "ssh");

        let public = &items[1];
        assert_eq!(public.url, "https://github.com");
        assert_eq!(public.repository_query, "none");
        assert!(public.initial_enablement);
    }
}
