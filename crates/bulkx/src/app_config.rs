//! 🔧 App configuration: TOML, environment, and a lot of defaults.
//!
//! Everything has a default, so an empty file (or no file at all) is a valid config that reads
//! stdin and ships clean documents to `http://localhost:9200` in batches of ten.
//!
//! Environment variables are `BULKX_` prefixed, with `__` between table and key:
//! `BULKX_OUTPUT__SERVER=http://es:9200`, `BULKX_RUNTIME__QUEUE_CAPACITY=64`.
//! The TOML file, when given, wins over the environment.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::indexers::FlushPolicy;
use crate::sources::SourceConfig;

/// 📦 The whole configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 📡 Where documents go, how they look, and how often they leave.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// `http://host[:port]`, or `memory://` for a dry run. Any path is ignored.
    pub server: String,
    /// Only shows up in logs.
    pub cluster: String,
    /// `%{...}` placeholders allowed.
    pub index: String,
    pub type_name: String,
    /// Empty means the store assigns ids.
    pub id: String,
    /// `raw`, `payload` or `clean`.
    pub format: String,
    /// Clean format only. Empty means all ten built-ins.
    pub fields: Vec<String>,
    /// Reference-time layout for document timestamps and `_timestamp`.
    pub timestamp: String,
    /// Use the record's time for `%{<layout>}` in index names, not the wall clock.
    pub index_from_timestamp: bool,
    /// Fields whose value is already JSON, written without quotes.
    pub raw_bytes_fields: Vec<String>,
    /// Milliseconds. 0 turns the timer off.
    pub flush_interval: u64,
    pub flush_count: usize,
    /// Optional byte ceiling per batch, on top of the count.
    pub flush_bytes: Option<usize>,
    /// Milliseconds per bulk request. 0 means no timeout.
    pub http_timeout: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:9200".to_string(),
            cluster: "bulkx".to_string(),
            index: "heka-%{2006.01.02}".to_string(),
            type_name: "message".to_string(),
            id: String::new(),
            format: "clean".to_string(),
            fields: Vec::new(),
            timestamp: "2006-01-02T15:04:05.000Z".to_string(),
            index_from_timestamp: false,
            raw_bytes_fields: Vec::new(),
            flush_interval: 1000,
            flush_count: 10,
            flush_bytes: None,
            http_timeout: 0,
        }
    }
}

impl OutputConfig {
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval > 0).then(|| Duration::from_millis(self.flush_interval))
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout > 0).then(|| Duration::from_millis(self.http_timeout))
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy {
            max_count: self.flush_count,
            max_bytes: self.flush_bytes,
        }
    }
}

/// ⚙️ Knobs that are about the process, not the output.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Records allowed between the source and the producer. Keep it small, it's the backpressure.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 🚀 Load the config from `BULKX_*` environment variables, plus the TOML file if one is given.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name.map_or_else(|| "environment only".to_string(), |p| p.display().to_string())
    );

    let config = Figment::new().merge(Env::prefixed("BULKX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from '{}' and BULKX_* variables",
            path.display()
        ),
        None => "💀 Failed to parse configuration from BULKX_* variables".to_string(),
    };
    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FileSourceConfig;

    // -- every test runs in a figment Jail: its own cwd and a lock around the process env
    fn load_in_jail(
        jail: &mut figment::Jail,
        contents: &str,
    ) -> figment::error::Result<AppConfig> {
        jail.create_file("bulkx.toml", contents)?;
        load_config(Some(Path::new("bulkx.toml"))).map_err(|err| format!("{err:#}").into())
    }

    #[test]
    fn the_one_where_an_empty_file_is_all_defaults() {
        figment::Jail::expect_with(|jail| {
            let config = load_in_jail(jail, "")?;
            assert_eq!(config.output, OutputConfig::default());
            assert_eq!(config.source, SourceConfig::Stdin);
            assert_eq!(config.runtime.queue_capacity, 10);
            assert_eq!(config.output.flush_interval(), Some(Duration::from_secs(1)));
            assert_eq!(config.output.http_timeout(), None);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_file_gets_its_way() {
        figment::Jail::expect_with(|jail| {
            let config = load_in_jail(
                jail,
                r#"
                [output]
                server = "http://es.internal:9201"
                index = "%{Type}-%{2006.01}"
                format = "payload"
                fields = ["Uuid", "Fields"]
                raw_bytes_fields = ["embedded"]
                flush_count = 500
                flush_interval = 0
                http_timeout = 2500

                [source.File]
                file_name = "records.ndjson"

                [runtime]
                queue_capacity = 3
                "#,
            )?;
            assert_eq!(config.output.server, "http://es.internal:9201");
            assert_eq!(config.output.index, "%{Type}-%{2006.01}");
            assert_eq!(config.output.fields, vec!["Uuid", "Fields"]);
            assert_eq!(config.output.flush_policy(), FlushPolicy::by_count(500));
            assert_eq!(config.output.flush_interval(), None);
            assert_eq!(
                config.output.http_timeout(),
                Some(Duration::from_millis(2500))
            );
            // -- untouched keys keep their defaults
            assert_eq!(config.output.type_name, "message");
            assert_eq!(
                config.source,
                SourceConfig::File(FileSourceConfig {
                    file_name: "records.ndjson".to_string()
                })
            );
            assert_eq!(config.runtime.queue_capacity, 3);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_environment_chimes_in() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BULKX_OUTPUT__SERVER", "http://from-env:9200");
            jail.set_env("BULKX_OUTPUT__FLUSH_COUNT", "42");

            let env_only = load_config(None).map_err(|err| err.to_string())?;
            assert_eq!(env_only.output.server, "http://from-env:9200");
            assert_eq!(env_only.output.flush_count, 42);

            let both = load_in_jail(jail, "[output]\nflush_count = 7\n")?;
            assert_eq!(both.output.server, "http://from-env:9200");
            assert_eq!(both.output.flush_count, 7);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_a_typo_in_a_number_is_caught() {
        figment::Jail::expect_with(|jail| {
            assert!(load_in_jail(jail, "[output]\nflush_count = \"lots\"\n").is_err());
            Ok(())
        });
    }
}
