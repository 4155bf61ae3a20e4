//! CLI argument parsing and command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::resolver::Query;

/// Resolve free-form queries to Home Assistant entities
#[derive(Debug, Parser)]
#[command(
    name = "hmatch",
    author,
    version,
    about = "Resolve free-form queries to Home Assistant entities",
    propagate_version = true,
    after_help = "Use 'hmatch <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Command,
}

/// Global options available to all commands
#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Output format (json, yaml, table, auto)
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        global = true,
        conflicts_with = "json"
    )]
    pub output_format: Option<OutputFormat>,

    /// Output as JSON (shorthand for -o json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Home Assistant server URL
    #[arg(short = 's', long, env = "HASS_SERVER", global = true)]
    pub server: Option<String>,

    /// Authentication token
    #[arg(long, env = "HASS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Skip SSL certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Read entity states from a JSON file ("-" for stdin) instead of the server
    #[arg(long, value_name = "PATH", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Minimum score a candidate must exceed (0.0 - 1.0)
    #[arg(long, value_name = "SCORE", value_parser = parse_threshold, global = true)]
    pub threshold: Option<f64>,

    /// Override config file path
    #[arg(long, value_name = "PATH", env = "HMATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase logging verbosity (stackable: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    pub trace: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Hide table headers
    #[arg(long, global = true)]
    pub no_headers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[non_exhaustive]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
    Auto,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a query to the single best matching entity
    Resolve(QueryArgs),

    /// List candidate entities ranked by score
    Match {
        #[command(flatten)]
        query: QueryArgs,

        /// Include every entity, ignoring the threshold
        #[arg(long)]
        all: bool,
    },

    /// Resolve an entity and perform an action on it
    ///
    /// Positional forms: TYPE ACTION, AREA TYPE ACTION, AREA TYPE ACTION VALUE...
    #[command(after_help = "Examples:\n  \
        hmatch do lights on\n  \
        hmatch do living lights off\n  \
        hmatch do kitchen fan speed 75\n  \
        hmatch do bedroom climate temp 21")]
    Do(DoCommand),

    /// Show an entity's state by name, or entity counts without a name
    Status {
        /// Entity name (e.g., "kitchen light")
        name: Vec<String>,
    },

    /// List automations, or trigger one by name
    Automation(TriggerArgs),

    /// List scenes, or activate one by name
    Scene(TriggerArgs),

    /// Inspect how queries are interpreted
    Debug {
        #[command(subcommand)]
        command: DebugCommand,
    },

    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Query fields shared by resolve and match
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Area phrase or alias (e.g., "living room", "lr")
    #[arg(short, long, default_value = "")]
    pub area: String,

    /// Entity type phrase (e.g., "lights", "thermostat")
    #[arg(short = 't', long = "type", default_value = "")]
    pub entity_type: String,

    /// Name phrase matched against friendly names
    #[arg(short, long, default_value = "")]
    pub name: String,
}

impl From<QueryArgs> for Query {
    fn from(args: QueryArgs) -> Self {
        Query::new(args.area, args.entity_type, args.name)
    }
}

#[derive(Debug, Clone, Args)]
pub struct DoCommand {
    /// [AREA] TYPE ACTION [VALUE...]
    #[arg(required = true, num_args = 2.., value_name = "WORDS")]
    pub words: Vec<String>,

    /// Show the service call without sending it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TriggerArgs {
    /// Name to look up; lists all when omitted
    pub name: Vec<String>,

    /// Show the service call without sending it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Subcommand)]
pub enum DebugCommand {
    /// Show which domain an entity type phrase resolves to
    Domain {
        /// Entity type phrase
        phrase: String,
    },

    /// List snapshot entities with optional filter
    Entities {
        /// Filter by entity_id or friendly_name (fuzzy match)
        filter: Option<String>,

        /// Only entities of this domain (e.g., "light")
        #[arg(long)]
        domain: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show effective configuration
    Show,

    /// Print config file path
    Path,

    /// Get a specific configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: Option<String>,
    },

    /// Reset configuration to defaults
    Reset,

    /// Check the server connection and count its entities
    Test,
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("invalid threshold value: {s}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err("threshold must be between 0.0 and 1.0".to_string());
    }
    Ok(value)
}
