use clap::{Parser, Subcommand};
use recur_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recurring to-do lists", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,

    /// Open the list named by a shared link or path
    ///
    /// Example: recur --open https://todo.example.com/groceries
    #[arg(long, value_name = "LINK", global = true)]
    pub open: Option<String>,

    /// Keep tasks in memory for this run instead of the remote collection
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive session; due recurring tasks reappear while it runs
    ///
    /// Example: recur session
    Session,
    /// Show pending and completed tasks
    ///
    /// Example: recur list
    List,
    /// Add a task, optionally recurring
    ///
    /// Example: recur add "Water plants" --every 3d
    /// Example: recur add "Renew passport"
    Add {
        description: String,
        /// Interval such as 12h, 7d, 2w or 1y
        #[arg(long, value_name = "INTERVAL")]
        every: Option<String>,
    },
    /// Mark a task as completed
    ///
    /// Example: recur done r1a2b3
    Done { id: String },
    /// Move a completed task back to pending
    ///
    /// Example: recur undo r1a2b3
    Undo { id: String },
    /// Delete a task
    ///
    /// Example: recur delete r1a2b3
    Delete { id: String },
    /// Reopen recurring tasks that are due now
    ///
    /// Example: recur tick
    Tick,
    /// Show lists opened on this device
    ///
    /// Example: recur lists
    Lists,
    /// Switch to another list
    ///
    /// Example: recur switch groceries
    Switch { name: String },
    /// Forget the current list and ask for a new one
    ///
    /// Example: recur new
    New,
    /// Remove a list from the lists opened on this device
    ///
    /// Example: recur forget groceries
    Forget { name: String },
    /// Print a link that opens the current list elsewhere
    ///
    /// Example: recur share
    Share,
}

impl Command {
    /// Commands that only touch the local list state.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Lists | Self::Switch { .. } | Self::New | Self::Forget { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    BaseUrl,
    CollectionName,
    PageSize,
    TickIntervalMs,
    RemoteTimeoutSecs,
    PublicUrl,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "base_url" | "url" => ConfigOverrideTarget::BaseUrl,
        "collection_name" | "collection" => ConfigOverrideTarget::CollectionName,
        "page_size" => ConfigOverrideTarget::PageSize,
        "tick_interval_ms" | "tick_interval" => ConfigOverrideTarget::TickIntervalMs,
        "remote_timeout_secs" | "remote_timeout" => ConfigOverrideTarget::RemoteTimeoutSecs,
        "public_url" => ConfigOverrideTarget::PublicUrl,
        "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Collects every `--config-override` into one set of overrides.
pub fn build_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for raw in raw_overrides {
        let parsed = parse_config_override(raw)?;
        let value = parsed.value;
        match parsed.target {
            ConfigOverrideTarget::BaseUrl => overrides.base_url = Some(value),
            ConfigOverrideTarget::CollectionName => overrides.collection_name = Some(value),
            ConfigOverrideTarget::PageSize => overrides.page_size = Some(parse_number(&value)?),
            ConfigOverrideTarget::TickIntervalMs => {
                overrides.tick_interval_ms = Some(parse_number(&value)?)
            }
            ConfigOverrideTarget::RemoteTimeoutSecs => {
                overrides.remote_timeout_secs = Some(parse_number(&value)?)
            }
            ConfigOverrideTarget::PublicUrl => overrides.public_url = Some(value),
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(value),
        }
    }

    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("'{value}' is not a valid number"))
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
