use std::sync::Arc;

use console::style;
use forgesync::http::reqwest_transport::ReqwestTransport;
use forgesync::{
    ExternalRepoSpec, HttpCloneProbe, RepoLookup, RepoLookupArgs, ResolvedRepo, Resolver,
};

use crate::commands::limits::OutputFormat;
use crate::commands::shared::load_registry;
use crate::config::Config;

/// Arguments of the `lookup` command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct LookupOptions {
    /// Repository URI, e.g. github.com/acme/widgets
    pub repo: Option<String>,

    /// Opaque repository ID on the service (GraphQL node ID)
    #[arg(long, requires = "service_id")]
    pub external_id: Option<String>,

    /// Connection URL the external ID belongs to, e.g. https://github.com
    #[arg(long, requires = "external_id")]
    pub service_id: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl LookupOptions {
    fn args(&self) -> RepoLookupArgs {
        let external_repo = self
            .external_id
            .clone()
            .zip(self.service_id.clone())
            .map(|(id, service_id)| ExternalRepoSpec {
                id,
                service_type: forgesync::connection::SERVICE_TYPE.to_string(),
                service_id,
            });
        RepoLookupArgs {
            external_repo,
            repo: self.repo.clone(),
        }
    }
}

/// Resolve one repository and print the outcome.
pub(crate) async fn handle_lookup(
    config: &Config,
    opts: LookupOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let args = opts.args();
    if args.repo.is_none() && args.external_repo.is_none() {
        return Err("give a repository URI or --external-id with --service-id".into());
    }

    let registry = load_registry(config);
    let transport = ReqwestTransport::with_timeout(config.client_settings().timeout)?;
    let probe = Arc::new(HttpCloneProbe::new(Arc::new(transport)));
    let resolver = Resolver::new(registry, probe, config.lookup);

    match resolver.lookup(&args).await? {
        RepoLookup::Resolved(repo) => print_resolved(&repo, opts.output)?,
        RepoLookup::Unhandled => {
            eprintln!(
                "{} no configured connection handles this repository",
                style("Not handled:").yellow().bold()
            );
            std::process::exit(2);
        }
    }
    Ok(())
}

fn print_resolved(
    repo: &ResolvedRepo,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = redacted(repo);
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&repo)?),
        OutputFormat::Table => {
            println!("{} {}", style("URI:").bold(), repo.uri);
            match &repo.external_repo {
                Some(spec) => println!(
                    "{} {} on {}",
                    style("External ID:").bold(),
                    spec.id,
                    spec.service_id
                ),
                None => println!(
                    "{} {}",
                    style("External ID:").bold(),
                    style("unknown (API bypassed)").dim()
                ),
            }
            if !repo.description.is_empty() {
                println!("{} {}", style("Description:").bold(), repo.description);
            }
            println!("{} {}", style("Fork:").bold(), repo.fork);
            println!("{} {}", style("Clone URL:").bold(), repo.clone_url);
        }
    }
    Ok(())
}

/// Copy of `repo` safe to print: credentials in the clone URL are masked.
fn redacted(repo: &ResolvedRepo) -> ResolvedRepo {
    ResolvedRepo {
        clone_url: redact(&repo.clone_url),
        ..repo.clone()
    }
}

/// Hide credentials embedded in a clone URL.
fn redact(clone_url: &str) -> String {
    match url::Url::parse(clone_url) {
        Ok(mut parsed) if !parsed.username().is_empty() => {
            let _ = parsed.set_username("****");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => clone_url.to_string(),
    }
}
