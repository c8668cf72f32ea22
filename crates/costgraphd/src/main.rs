use std::time::Duration;

use anyhow::{Context, Result};
use costgraph_config::{config_path, ensure_workspace_config, validate_config};
use costgraph_query::PodQueries;
use costgraph_store::DgraphHttpStore;
use costgraphd::cli::{Cli, parse_cli};
use costgraphd::commands::{request_for, run_command};
use costgraphd::logging::init_logging;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.log_format);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }

    let endpoint = cli
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .unwrap_or(&config.store.endpoint);
    let timeout = (config.store.timeout_secs > 0)
        .then(|| Duration::from_secs(config.store.timeout_secs));
    let store = DgraphHttpStore::new(endpoint, timeout);
    let queries = PodQueries::new(store, config.pricing);

    if cli.print_query {
        let query = request_for(&queries, &cli.command)?;
        println!("{query}");
        return Ok(());
    }

    tracing::debug!(endpoint = %queries.store().query_url(), "sending request");
    let mut out = std::io::stdout().lock();
    run_command(&queries, &cli.command, &mut out)
}
