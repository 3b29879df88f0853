//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." said every developer at 3am 🦆
//!
//! 🧠 Knowledge graph:
//! - `XFY_*` environment variables are the base layer, nested keys split on `__`
//!   (`XFY_XAPI__ANONYMIZATION__SALT` → `xapi.anonymization.salt`).
//! - An optional TOML file is merged on top. TOML wins on conflicts.
//! - `xapi` is the only required section. No source? stdin. No sink? stdout.
//! - Backend configs live with their backends and are re-exported from here.

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

pub use crate::backends::{
    CommonSourceConfig, FileSinkConfig, FileSourceConfig, InMemorySourceConfig, StdinSourceConfig,
};
pub use crate::selector::XapiConfig;

/// 📦 One struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub xapi: XapiConfig,
    #[serde(default)]
    pub source_config: SourceConfig,
    #[serde(default)]
    pub sink_config: SinkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🚰 Where tracking log lines come from.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    File(FileSourceConfig),
    Stdin(StdinSourceConfig),
    InMemory(InMemorySourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Stdin(StdinSourceConfig::default())
    }
}

/// 🕳️ Where xAPI statements go.
#[derive(Debug, Deserialize, Clone, Default)]
pub enum SinkConfig {
    File(FileSinkConfig),
    #[default]
    Stdout,
    InMemory,
}

/// 🧵 Pipeline knobs.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 📬 pages in flight between the source worker and the convert worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 🙈 log and count conversion errors instead of stopping at the first one
    #[serde(default)]
    pub ignore_conversion_errors: bool,
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            ignore_conversion_errors: false,
        }
    }
}

/// 🚀 Load the config from `XFY_*` env vars, plus the TOML file if one was given.
///
/// 📐 `None` means env vars only. No file. No assumptions. No pizza defaults.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("XFY_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (XFY_*). \
             Is there an [xapi] section with a platform_url?",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (XFY_*). \
                 No file was provided, so at least XFY_XAPI__PLATFORM_URL has to be set."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    fn extract(contents: &str) -> anyhow::Result<AppConfig> {
        // -- TOML only, so stray XFY_* vars on the test machine stay out of it
        let file = write_test_config(contents)?;
        Ok(Figment::new().merge(Toml::file(file.path())).extract()?)
    }

    #[test]
    fn the_one_where_everything_is_spelled_out() -> anyhow::Result<()> {
        let app_config = extract(
            r#"
            [xapi]
            platform_url = "https://lms.example.com"

            [xapi.anonymization]
            enabled = true
            salt = "pepper-and-salt"
            hash_indexes = "1,2,3,10"

            [runtime]
            queue_capacity = 4
            ignore_conversion_errors = true

            [source_config.File]
            file_name = "tracking.log.gz"

            [source_config.File.common_config]
            max_batch_size_docs = 50

            [sink_config.File]
            file_name = "statements.ndjson"
            "#,
        )?;

        assert_eq!(app_config.xapi.platform_url, "https://lms.example.com");
        assert!(app_config.xapi.anonymization.enabled);
        assert_eq!(app_config.xapi.anonymization.hash_indexes, "1,2,3,10");
        assert_eq!(app_config.xapi.anonymization.time_cost, 1);
        assert_eq!(app_config.xapi.anonymization.memory_cost, 8);
        assert_eq!(
            app_config.runtime,
            RuntimeConfig {
                queue_capacity: 4,
                ignore_conversion_errors: true
            }
        );
        match app_config.source_config {
            SourceConfig::File(file) => {
                assert_eq!(file.file_name, "tracking.log.gz");
                assert_eq!(file.common_config.max_batch_size_docs, 50);
                assert_eq!(
                    file.common_config.max_batch_size_bytes,
                    CommonSourceConfig::default().max_batch_size_bytes
                );
            }
            honestly_who_knows => panic!("💀 expected a File source, got {honestly_who_knows:?}"),
        }
        assert!(matches!(app_config.sink_config, SinkConfig::File(_)));
        Ok(())
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() -> anyhow::Result<()> {
        let app_config = extract(
            r#"
            [xapi]
            platform_url = "https://lms.example.com"
            "#,
        )?;
        assert!(!app_config.xapi.anonymization.enabled);
        assert!(matches!(app_config.source_config, SourceConfig::Stdin(_)));
        assert!(matches!(app_config.sink_config, SinkConfig::Stdout));
        assert_eq!(app_config.runtime, RuntimeConfig::default());
        assert_eq!(app_config.runtime.queue_capacity, 10);
        Ok(())
    }

    #[test]
    fn the_one_where_a_unit_sink_is_just_a_string() -> anyhow::Result<()> {
        // -- plain toml, no figment: the shape has to hold up on its own
        let app_config: AppConfig = toml::from_str(
            r#"
            sink_config = "InMemory"

            [xapi]
            platform_url = "https://lms.example.com"

            [source_config.Stdin.common_config]
            max_batch_size_bytes = 1024
            "#,
        )?;
        assert!(matches!(app_config.sink_config, SinkConfig::InMemory));
        match app_config.source_config {
            SourceConfig::Stdin(stdin) => {
                assert_eq!(stdin.common_config.max_batch_size_bytes, 1024);
                assert_eq!(stdin.common_config.max_batch_size_docs, 1000);
            }
            other => panic!("💀 expected a Stdin source, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn the_one_where_the_xapi_section_is_not_optional() -> anyhow::Result<()> {
        if std::env::var_os("XFY_XAPI__PLATFORM_URL").is_some() {
            // -- the environment already filled the gap, nothing to prove here
            return Ok(());
        }
        let file = write_test_config("[runtime]\nqueue_capacity = 2\n")?;
        let err = load_config(Some(file.path())).expect_err("no [xapi], no config");
        assert!(err.to_string().contains("platform_url"));
        Ok(())
    }
}
