//! Profile configuration for phloem
//!
//! Runs are described by TOML profiles so a measurement can be repeated
//! exactly. Any field can be overridden from the command line with
//! `--set key.path=value`.

use anyhow::{bail, Context, Result};
use phloem_core::{BenchmarkConfig, ChannelOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level profile configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ProfileConfig {
    pub experiment: ExperimentConfig,
    pub target: TargetConfig,
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub drain: DrainConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Experiment metadata
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Seed for payload selection (None = use entropy)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Length of the send phase
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub duration: Duration,
}

/// Local endpoints the decision service connects to
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct TargetConfig {
    /// Interface to bind both sockets on (e.g. "127.0.0.1" or "*")
    #[serde(default = "default_address")]
    pub address: String,
    /// Port of the PUSH socket requests are sent on (0 = OS-assigned)
    pub send_port: u16,
    /// Port of the PULL socket replies arrive on
    pub receive_port: u16,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

/// Request generation
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct WorkloadConfig {
    /// Requests per second
    pub rate: f64,
    /// Newline-separated domain list
    pub domains: PathBuf,
    /// Newline-separated IP list
    pub ips: PathBuf,
}

/// Channel shutdown and drain behaviour
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DrainConfig {
    /// How long to wait for outstanding replies after the last send
    #[serde(with = "humantime_serde", default = "default_drain_timeout")]
    #[schemars(with = "String")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    #[schemars(with = "String")]
    pub poll_interval: Duration,
    /// Flush window for buffered requests when the send socket closes
    #[serde(with = "humantime_serde", default = "default_linger")]
    #[schemars(with = "String")]
    pub linger: Duration,
    /// Give up on a single send after this long
    #[serde(with = "humantime_serde", default = "default_send_timeout")]
    #[schemars(with = "String")]
    pub send_timeout: Duration,
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_linger() -> Duration {
    Duration::from_secs(1)
}

fn default_send_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            timeout: default_drain_timeout(),
            poll_interval: default_poll_interval(),
            linger: default_linger(),
            send_timeout: default_send_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OutputConfig {
    /// Output format: human, json
    #[serde(default = "default_format")]
    pub format: String,
    /// File for JSON results (stdout report is always printed)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_format() -> String {
    "human".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: default_format(), file: None }
    }
}

impl ProfileConfig {
    /// Load profile from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ProfileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load profile from TOML file with --set style overrides
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        for override_str in overrides {
            let (key, val) = parse_key_value(override_str)
                .with_context(|| format!("Invalid override format: {}", override_str))?;

            set_toml_path(&mut value, &key, &val)
                .with_context(|| format!("Failed to apply override: {}", override_str))?;
        }

        let config: ProfileConfig = value
            .try_into()
            .with_context(|| "Failed to deserialize modified configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.experiment.name.is_empty() {
            bail!("Experiment name cannot be empty");
        }
        if self.experiment.duration.is_zero() {
            bail!("Experiment duration must be > 0");
        }

        if self.target.address.is_empty() {
            bail!("Target address cannot be empty");
        }
        // Port 0 binds an OS-assigned port, reported with the results
        if self.target.send_port != 0 && self.target.send_port == self.target.receive_port {
            bail!("send_port and receive_port must differ (both {})", self.target.send_port);
        }

        if !(self.workload.rate.is_finite() && self.workload.rate > 0.0) {
            bail!("Workload rate must be > 0");
        }

        if self.drain.poll_interval.is_zero() {
            bail!("Drain poll_interval must be > 0");
        }

        let valid_formats = ["human", "json"];
        if !valid_formats.contains(&self.output.format.as_str()) {
            bail!(
                "Invalid output format '{}'. Valid options: {}",
                self.output.format,
                valid_formats.join(", ")
            );
        }
        if self.output.format == "json" && self.output.file.is_none() {
            bail!("JSON output requires output.file");
        }

        Ok(())
    }

    /// Run parameters for the measurement engine
    pub fn benchmark_config(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            drain_timeout: self.drain.timeout,
            drain_poll: self.drain.poll_interval,
            seed: self.experiment.seed,
            ..BenchmarkConfig::new(self.workload.rate, self.experiment.duration)
        }
    }

    /// Socket options for both channels
    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            linger: self.drain.linger,
            send_timeout: self.drain.send_timeout,
            recv_timeout: self.drain.poll_interval,
        }
    }
}

/// Parse a "key=value" string into (key, value) tuple
fn parse_key_value(override_str: &str) -> Result<(String, String)> {
    match override_str.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid override format '{}'. Expected 'key=value'", override_str),
    }
}

/// Path segment types
enum PathSegment {
    Key(String),
    Index(usize),
    Append,
}

/// Parse a path string into segments (handles "key", "0", "+")
fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part == "+" {
                PathSegment::Append
            } else if let Ok(idx) = part.parse::<usize>() {
                PathSegment::Index(idx)
            } else {
                PathSegment::Key(part.to_string())
            }
        })
        .collect()
}

/// Set a value in TOML using dot-notation path
fn set_toml_path(root: &mut toml::Value, path: &str, value_str: &str) -> Result<()> {
    let parts = parse_path(path);
    let Some((last, parents)) = parts.split_last() else {
        bail!("Empty path");
    };

    let mut current = root;
    for part in parents {
        current = match part {
            PathSegment::Key(key) => {
                let toml::Value::Table(table) = current else {
                    bail!("Cannot navigate through non-table value at key '{}'", key);
                };
                table
                    .entry(key.clone())
                    .or_insert_with(|| toml::Value::Table(Default::default()))
            }
            PathSegment::Index(idx) => {
                let toml::Value::Array(arr) = current else {
                    bail!("Cannot index non-array value");
                };
                let len = arr.len();
                arr.get_mut(*idx).with_context(|| {
                    format!("Array index {} out of bounds (length: {})", idx, len)
                })?
            }
            PathSegment::Append => bail!("Append operation '+' can only be at the end of path"),
        };
    }

    let parsed_value = parse_value(value_str)?;
    match (last, current) {
        (PathSegment::Key(key), toml::Value::Table(table)) => {
            table.insert(key.clone(), parsed_value);
        }
        (PathSegment::Key(key), _) => bail!("Cannot set key '{}' on non-table value", key),
        (PathSegment::Index(idx), toml::Value::Array(arr)) => {
            let len = arr.len();
            let slot = arr.get_mut(*idx).with_context(|| {
                format!("Array index {} out of bounds (length: {})", idx, len)
            })?;
            *slot = parsed_value;
        }
        (PathSegment::Append, toml::Value::Array(arr)) => arr.push(parsed_value),
        _ => bail!("Cannot index or append to non-array value"),
    }
    Ok(())
}

/// Parse a string value with type inference
fn parse_value(value_str: &str) -> Result<toml::Value> {
    let trimmed = value_str.trim();

    if trimmed == "true" {
        return Ok(toml::Value::Boolean(true));
    }
    if trimmed == "false" {
        return Ok(toml::Value::Boolean(false));
    }
    if let Ok(int_val) = trimmed.parse::<i64>() {
        return Ok(toml::Value::Integer(int_val));
    }
    if let Ok(float_val) = trimmed.parse::<f64>() {
        return Ok(toml::Value::Float(float_val));
    }

    // Arrays and inline tables go through the TOML parser
    if (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
    {
        let wrapped = format!("value = {}", trimmed);
        if let Ok(toml::Value::Table(mut table)) = toml::from_str::<toml::Value>(&wrapped) {
            if let Some(value) = table.remove("value") {
                return Ok(value);
            }
        }
        bail!("Failed to parse value: {}", trimmed);
    }

    let string_val = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    Ok(toml::Value::String(string_val.to_string()))
}
