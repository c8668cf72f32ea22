use std::io::Write;

use anyhow::{Context, Result};
use costgraph_core::Target;
use costgraph_query::{
    CostRates, PodQueries, cost_hierarchy_query, default_unit_prices, hierarchy_query,
    interactions_query, label_filter, label_uids_query, live_pods_query,
};
use costgraph_store::{GraphStore, Query};
use serde::Serialize;

use crate::cli::Commands;

pub fn run_command<S, W>(queries: &PodQueries<S>, command: &Commands, out: &mut W) -> Result<()>
where
    S: GraphStore,
    W: Write,
{
    match command {
        Commands::Interactions(args) => {
            match queries.interactions(&Target::parse(&args.name), args.orphans) {
                Some(raw) => out.write_all(&raw)?,
                None => out.write_all(b"null")?,
            }
            writeln!(out)?;
        }
        Commands::Hierarchy { name } => {
            write_json(out, &queries.hierarchy(&Target::parse(name)))?;
        }
        Commands::Metrics { name } => {
            write_json(out, &queries.cost_hierarchy(&Target::parse(name)))?;
        }
        Commands::Labels(args) => {
            let uids = queries
                .uids_by_labels(&args.to_filter())
                .context("label lookup failed")?;
            write_json(out, &uids)?;
        }
        Commands::LivePods => {
            let pods = queries.live_pods().context("live pod lookup failed")?;
            write_json(out, &pods)?;
        }
    }

    Ok(())
}

/// The request `command` would send. Cost requests use the configured
/// default prices, since resolving overrides needs a store round trip.
pub fn request_for<S: GraphStore>(queries: &PodQueries<S>, command: &Commands) -> Result<Query> {
    let query = match command {
        Commands::Interactions(args) => {
            interactions_query(&Target::parse(&args.name), args.orphans)
        }
        Commands::Hierarchy { name } => hierarchy_query(single_pod(name)?),
        Commands::Metrics { name } => {
            let name = single_pod(name)?;
            let prices = default_unit_prices(queries.pricing());
            let window = queries.billing_window();
            cost_hierarchy_query(
                name,
                window.elapsed_seconds(),
                CostRates {
                    cpu: prices.cpu,
                    memory: prices.memory,
                    storage: Some(queries.pricing().storage_per_gb_hour),
                },
            )
        }
        Commands::Labels(args) => {
            let filter = label_filter(&args.to_filter())
                .context("label filter needs at least one key=value pair")?;
            label_uids_query(filter)
        }
        Commands::LivePods => live_pods_query(),
    };

    Ok(query)
}

fn single_pod(name: &str) -> Result<&str> {
    match Target::parse(name) {
        Target::All => anyhow::bail!("a single pod name is required, got '{name}'"),
        Target::Named(_) => Ok(name.trim()),
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
    writeln!(out)?;
    Ok(())
}
