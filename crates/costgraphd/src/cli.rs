use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct InteractionsArgs {
    #[arg(long, default_value = "all", help = "Pod name, or 'all' for every pod")]
    pub name: String,

    #[arg(
        long,
        help = "With --name all, list only pods without outbound interactions"
    )]
    pub orphans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LabelsArgs {
    #[arg(
        long = "label",
        value_parser = parse_label,
        required = true,
        help = "Label pair as key=value, repeatable; pods matching any pair are returned"
    )]
    pub labels: Vec<(String, String)>,
}

impl LabelsArgs {
    pub fn to_filter(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped = BTreeMap::<String, Vec<String>>::new();
        for (key, value) in &self.labels {
            grouped.entry(key.clone()).or_default().push(value.clone());
        }
        grouped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Show the pods a pod talks to and the pods talking to it
    Interactions(InteractionsArgs),
    /// Show a pod and its containers
    Hierarchy {
        #[arg(help = "Pod name")]
        name: String,
    },
    /// Show a pod and its containers with prorated cost for the current month
    Metrics {
        #[arg(help = "Pod name")]
        name: String,
    },
    /// List uids of pods carrying any of the given labels
    Labels(LabelsArgs),
    /// List running pods with their interactions and services
    LivePods,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Pod cost and topology queries over Dgraph")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .costgraph/config.toml"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        help = "Dgraph HTTP endpoint, overrides [store].endpoint"
    )]
    pub endpoint: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Print the DQL request instead of sending it"
    )]
    pub print_query: bool,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_label(value: &str) -> Result<(String, String), String> {
    let (key, label_value) = value
        .split_once('=')
        .ok_or_else(|| format!("invalid label '{value}', expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid label '{value}', key must not be empty"));
    }

    Ok((key.to_owned(), label_value.trim().to_owned()))
}
