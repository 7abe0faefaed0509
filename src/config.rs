use crate::errors::{Result, TrafficError};
use crate::fetch::DEFAULT_API_BASE;
use crate::storage::DEFAULT_DATA_PATH;
use crate::ui::default_report_name;
use clap::Parser;
use std::{env, path::PathBuf};

pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
const API_BASE_VAR: &str = "GITHUB_API_URL";
const DATA_PATH_VAR: &str = "TRAFFIC_DATA_PATH";

#[derive(Parser, Debug)]
#[command(
    name = "repo_traffic",
    about = "Record GitHub traffic for a repository and render an HTML dashboard",
    version,
    long_about = None
)]
pub struct Args {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// CSV file holding the traffic history
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Dashboard output path [default: <owner>_<repo>_traffic_dashboard.html]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base URL of the repositories API
    #[arg(long)]
    pub api_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything a run needs, resolved once before the pipeline starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub api_base: String,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
}

/// The process environment as seen at startup. Nothing past `config` reads
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub data_path: Option<PathBuf>,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            token: env::var(TOKEN_VAR).ok(),
            api_base: env::var(API_BASE_VAR).ok(),
            data_path: env::var_os(DATA_PATH_VAR).map(PathBuf::from),
        }
    }
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        Self::resolve(args, Environment::capture())
    }

    /// Command-line options win over the environment, which wins over defaults.
    pub fn resolve(args: Args, environment: Environment) -> Result<Self> {
        let token = environment
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(TrafficError::MissingCredential { var: TOKEN_VAR })?;

        let api_base = args
            .api_base
            .or(environment.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let data_path = args
            .data
            .or(environment.data_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let output_path = args
            .output
            .unwrap_or_else(|| PathBuf::from(default_report_name(&args.owner, &args.repo)));

        Ok(Self {
            owner: args.owner,
            repo: args.repo,
            token,
            api_base,
            data_path,
            output_path,
        })
    }
}
