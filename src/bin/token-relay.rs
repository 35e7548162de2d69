use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use token_relay::container::Container;
use token_relay::lifecycle::binding::TokenMirror;
use token_relay::observability::metrics::encode_metrics;
use token_relay::sources::Credential;
use token_relay::utils::config_loader;
use token_relay::utils::logging;
use token_relay::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-relay.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[arg(short, long, env = "RELAY_USERNAME")]
    username: Option<String>,
    #[arg(short, long, env = "RELAY_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// GraphQL query sent after signing in
    #[arg(short, long, conflicts_with = "query_file")]
    query: Option<String>,
    #[arg(long)]
    query_file: Option<String>,
    /// JSON object with the query variables
    #[arg(long)]
    variables: Option<String>,
}

impl Args {
    fn credential(&self) -> Result<Option<Credential>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Some(Credential::new(username, password))),
            (None, None) => Ok(None),
            _ => Err(anyhow!("--username and --password must be given together")),
        }
    }

    async fn query(&self) -> Result<String> {
        match (&self.query, &self.query_file) {
            (Some(query), _) => Ok(query.clone()),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read query file {}", path)),
            (None, None) => Err(anyhow!("either --query or --query-file is required")),
        }
    }

    fn variables(&self) -> Result<Option<Value>> {
        self.variables
            .as_deref()
            .map(|raw| serde_json::from_str(raw).context("--variables must be valid JSON"))
            .transpose()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Parse arguments, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    let credential = args.credential()?;
    let query = args.query().await?;
    let variables = args.variables()?;

    // -------------------------------
    // 2. Wire the shared token store into every component
    // -------------------------------

    let container = Container::from_config(&service_config)?;
    let mut binding = container.binding(TokenMirror::default());

    // -------------------------------
    // 3. Sign in and query while the binding is active
    // -------------------------------

    info!("Service starting...");
    let app = &container;
    let data = binding
        .run_scoped(|mirror| async move {
            if let Some(credential) = credential {
                app.sign_in().execute(credential).await?;
            }
            info!(authenticated = !mirror.get().is_empty(), "sending query");
            app.graphql().query(&query, variables).await
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&data)?);

    // -------------------------------
    // 4. Metrics dump
    // -------------------------------

    if service_config.settings.metrics.is_enabled {
        eprintln!("{}", encode_metrics()?);
    }

    Ok(())
}
