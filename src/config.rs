//! Settings for the resolver and the Home Assistant connection
//!
//! Values are layered: built-in defaults, then `config.toml`, then
//! `HMATCH__SECTION__KEY` variables. Command-line flags win over all of them;
//! apart from `--no-headers` they are applied by the [`RuntimeContext`]
//! accessors instead of being written into [`AppConfig`].

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use env_logger::fmt::WriteStyle;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::resolver::Resolver;

const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Parsed flags plus loaded settings, handed to every command
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub global: GlobalOpts,
    pub config: AppConfig,
    config_path: PathBuf,
}

impl RuntimeContext {
    pub fn new(global: &GlobalOpts) -> Result<Self> {
        let config_path = resolve_config_path(global.config.as_ref())?;
        let config = load_config(&config_path, global)?;

        Ok(Self {
            global: global.clone(),
            config,
            config_path,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn init_logging(&self) -> Result<()> {
        if self.global.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.config.logging.level),
        );

        builder.filter_level(self.effective_log_level());

        let force_color = env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.global.no_color
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !std::io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        builder.try_init().or_else(|err| {
            if self.global.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.global.trace {
            LevelFilter::Trace
        } else if self.global.debug {
            LevelFilter::Debug
        } else {
            match self.global.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    /// `--server`/`HASS_SERVER`, else `homeassistant.server`
    pub fn server_url(&self) -> Result<&str> {
        self.global
            .server
            .as_deref()
            .or(self.config.homeassistant.server.as_deref())
            .ok_or_else(|| {
                anyhow!(
                    "No Home Assistant server configured.\n\
                    Set via --server, HASS_SERVER env var, or in config file."
                )
            })
    }

    pub fn token(&self) -> Result<&str> {
        self.global
            .token
            .as_deref()
            .or(self.config.homeassistant.token.as_deref())
            .ok_or_else(|| {
                anyhow!(
                    "No authentication token configured.\n\
                    Set via --token, HASS_TOKEN env var, or in config file."
                )
            })
    }

    /// Request timeout in seconds
    pub fn timeout(&self) -> u64 {
        self.global
            .timeout
            .unwrap_or(self.config.homeassistant.timeout)
    }

    pub fn insecure(&self) -> bool {
        self.global.insecure || self.config.homeassistant.insecure
    }

    /// `--threshold`, else `resolver.threshold`
    pub fn threshold(&self) -> f64 {
        self.global
            .threshold
            .unwrap_or(self.config.resolver.threshold)
    }

    /// Build a resolver for the effective aliases and threshold
    pub fn resolver(&self) -> Resolver {
        Resolver::new(&self.config.aliases, self.threshold())
    }

    /// `--json` beats `-o`, which beats `output.format`
    pub fn output_format(&self) -> OutputFormat {
        if self.global.json {
            return OutputFormat::Json;
        }

        self.global
            .output_format
            .unwrap_or(match self.config.output.format.as_str() {
                "json" => OutputFormat::Json,
                "yaml" => OutputFormat::Yaml,
                "table" => OutputFormat::Table,
                _ => OutputFormat::Auto,
            })
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub homeassistant: HomeAssistantConfig,
    pub resolver: ResolverConfig,
    /// Area aliases, e.g. `lr = "living room"`
    pub aliases: HashMap<String, String>,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    pub server: Option<String>,
    pub token: Option<String>,
    pub timeout: u64,
    pub insecure: bool,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            server: None,
            token: None,
            timeout: 10,
            insecure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidates must score strictly above this
    pub threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub no_headers: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
            no_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

fn resolve_config_path(override_path: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        let expanded = expand_path(path)?;
        if expanded.is_dir() {
            return Ok(expanded.join("config.toml"));
        }
        return Ok(expanded);
    }

    Ok(default_config_dir()?.join("config.toml"))
}

fn load_config(config_path: &Path, global: &GlobalOpts) -> Result<AppConfig> {
    // First run writes a commented template
    if !config_path.exists() {
        write_default_config(config_path)?;
    }

    let config = Config::builder()
        .set_default("homeassistant.timeout", 10_i64)?
        .set_default("homeassistant.insecure", false)?
        .set_default("resolver.threshold", 0.5_f64)?
        .set_default("output.format", "auto")?
        .set_default("output.no_headers", false)?
        .set_default("logging.level", "warn")?
        .add_source(
            File::from(config_path)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix("HMATCH")
                .try_parsing(true)
                .separator("__"),
        )
        .build()
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .with_context(|| format!("parsing config {}", config_path.display()))?;

    let threshold = app_config.resolver.threshold;
    if !(0.0..=1.0).contains(&threshold) {
        bail!("resolver.threshold must be between 0.0 and 1.0, got {threshold}");
    }

    if global.no_headers {
        app_config.output.no_headers = true;
    }

    Ok(app_config)
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config")?;

    let content = format!(
        "# hmatch configuration\n\
        # File: {}\n\
        #\n\
        # Environment variables:\n\
        #   HASS_SERVER - Home Assistant server URL\n\
        #   HASS_TOKEN  - Authentication token\n\
        #   HMATCH__*   - Override any config value (e.g., HMATCH__RESOLVER__THRESHOLD=0.6)\n\
        #\n\
        # Area aliases expand before matching, e.g.:\n\
        #   [aliases]\n\
        #   lr = \"living room\"\n\
        #   br = \"bedroom\"\n\
        \n\
        {toml}",
        path.display()
    );

    fs::write(path, content).with_context(|| format!("writing config to {}", path.display()))
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        let expanded = shellexpand::full(text).context("expanding path")?;
        Ok(PathBuf::from(expanded.to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["hmatch"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["config", "path"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.homeassistant.timeout, 10);
        assert!(!config.homeassistant.insecure);
        assert_eq!(config.resolver.threshold, 0.5);
        assert!(config.aliases.is_empty());
        assert_eq!(config.output.format, "auto");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[homeassistant]"));
        assert!(toml.contains("[resolver]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_write_and_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config(&path, &global(&[])).unwrap();
        assert!(path.exists());
        assert_eq!(config.resolver.threshold, 0.5);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_config_with_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[homeassistant]\n\
            server = \"http://ha.local:8123\"\n\
            \n\
            [resolver]\n\
            threshold = 0.65\n\
            \n\
            [aliases]\n\
            lr = \"living room\"\n\
            br = \"bedroom\"\n",
        )
        .unwrap();

        let config = load_config(&path, &global(&["--no-headers"])).unwrap();
        assert_eq!(config.resolver.threshold, 0.65);
        assert_eq!(config.aliases.get("lr").map(String::as_str), Some("living room"));
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(
            config.homeassistant.server.as_deref(),
            Some("http://ha.local:8123")
        );
        assert!(config.output.no_headers);
    }

    #[test]
    fn test_load_config_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolver]\nthreshold = 1.5\n").unwrap();

        let err = load_config(&path, &global(&[])).unwrap_err();
        assert!(err.to_string().contains("resolver.threshold"));
    }

    #[test]
    fn test_resolve_config_path_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_config_path(Some(&dir.path().to_path_buf())).unwrap();
        assert_eq!(path, dir.path().join("config.toml"));
    }

    #[test]
    fn test_threshold_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_arg = path.to_str().unwrap();

        let ctx = RuntimeContext::new(&global(&["--config", path_arg])).unwrap();
        assert_eq!(ctx.threshold(), 0.5);

        let ctx =
            RuntimeContext::new(&global(&["--config", path_arg, "--threshold", "0.7"])).unwrap();
        assert_eq!(ctx.threshold(), 0.7);
        assert_eq!(ctx.resolver().threshold(), 0.7);
    }

    #[test]
    fn test_json_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_arg = path.to_str().unwrap();

        let ctx = RuntimeContext::new(&global(&["--config", path_arg, "--json"])).unwrap();
        assert_eq!(ctx.output_format(), OutputFormat::Json);
    }
}
