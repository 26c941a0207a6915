use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::records::AggregationPolicy;

/// Output formats supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output (plain when not a TTY)
    #[default]
    Styled,
    /// Tab-separated plain text
    Plain,
    /// Comma-separated values
    Csv,
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

/// Command-line interface definition.
/// Groups junk-folder mail by origin domain and reports authentication stats.
///
/// Verbosity levels:
/// 0 - silent (only final output)
/// 1 - errors (default)
/// 2 - warnings + errors
/// 3 - info
/// 5 - trace/debug
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Group spam by the domain that actually sent it (DKIM, SPF or sender)"
)]
pub struct Cli {
    /// Read records from a JSON array file instead of Microsoft Graph
    #[arg(long, value_name = "FILE", conflicts_with = "eml_dir")]
    pub records: Option<PathBuf>,

    /// Read records from a directory of .eml files instead of Microsoft Graph
    #[arg(long, value_name = "DIR", conflicts_with = "records")]
    pub eml_dir: Option<PathBuf>,

    /// Microsoft Graph bearer token
    #[arg(long, env = "SPAMORIGIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum number of junk messages to analyze
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Which authenticated domain wins when both DKIM and SPF are present
    #[arg(long, value_enum)]
    pub policy: Option<AggregationPolicy>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Styled)]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show at most N groups (0 = all)
    #[arg(long, value_name = "N")]
    pub max_groups: Option<usize>,

    /// Sample messages shown per group (at most 5)
    #[arg(long, value_name = "N")]
    pub samples: Option<usize>,

    /// Hide the statistics block
    #[arg(long)]
    pub no_stats: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbosity level (0,1,2,3,5)
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Also fetch and show the signed-in account (Graph only)
    #[arg(long)]
    pub whoami: bool,

    /// Print the JSON schema of the structured output and exit
    #[arg(long)]
    pub generate_schema: bool,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Are error-level messages enabled?
    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }

    /// `tracing` filter directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 | 4 => "info",
            _ => "trace",
        }
    }

    /// JSON / YAML output requested?
    pub fn is_structured_output(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }

    /// Neither `--records` nor `--eml-dir`: records come from Graph.
    pub fn uses_graph(&self) -> bool {
        self.records.is_none() && self.eml_dir.is_none()
    }
}
