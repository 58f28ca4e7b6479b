//! Run configuration assembled from the command line and the environment.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use enrich_engine::{ControllerSettings, EnrichSettings, PacingSettings, SourceColumns};
use log::LevelFilter;

use super::cli::{Cli, Commands, ResumeMode};
use super::logging::LogDestination;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
pub const MODEL_VAR: &str = "ANTHROPIC_MODEL";
const DEFAULT_OUTPUT_DIR: &str = "enriched";

/// Which pass to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run { input: PathBuf },
    Retry,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub invocation: Invocation,
    pub controller: ControllerSettings,
    pub enrich: EnrichSettings,
    pub output_dir: PathBuf,
    /// `None` means decide from whether stdin is a terminal.
    pub resume: Option<ResumeMode>,
    pub log: LogDestination,
    pub log_level: LevelFilter,
}

impl AppConfig {
    /// Build from parsed arguments; `env` looks up environment variables.
    pub fn from_cli(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let common = cli.command.common();

        let api_key = env(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .with_context(|| format!("{API_KEY_VAR} is not set (environment or .env file)"))?;

        if common.name_column == common.payload_column {
            bail!(
                "name column and payload column must differ (both are `{}`)",
                common.name_column
            );
        }

        let mut enrich = EnrichSettings::new(api_key);
        if let Some(base_url) = env(BASE_URL_VAR).filter(|url| !url.trim().is_empty()) {
            enrich.base_url = base_url.trim().to_string();
        }
        if let Some(model) = common
            .model
            .clone()
            .or_else(|| env(MODEL_VAR))
            .filter(|model| !model.trim().is_empty())
        {
            enrich.model = model;
        }
        enrich.max_tokens = common.max_tokens;

        let controller = ControllerSettings {
            progress_path: common.progress_file.clone(),
            failed_export_path: common.failed_file.clone(),
            columns: SourceColumns {
                name: common.name_column.clone(),
                payload: common.payload_column.clone(),
            },
            pacing: PacingSettings {
                call_delay: common.delay_secs,
                cooldown: common.cooldown_secs,
                cooldown_every: common.cooldown_every,
            },
            call_timeout: common.call_timeout_secs,
        };

        let invocation = match &cli.command {
            Commands::Run { input, .. } => Invocation::Run {
                input: input.clone(),
            },
            Commands::Retry { .. } => Invocation::Retry,
        };

        Ok(Self {
            invocation,
            controller,
            enrich,
            output_dir: common.output_dir.clone(),
            resume: common.resume,
            log: common.log,
            log_level: if common.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        })
    }

    /// `retry` invocation that targets the same record, export, columns and
    /// output directory as this run.
    pub fn retry_command(&self) -> String {
        let mut parts = vec![
            "batch-enrich retry".to_string(),
            format!("--progress-file {}", quoted(&self.controller.progress_path)),
            format!("--failed-file {}", quoted(&self.controller.failed_export_path)),
        ];
        if self.output_dir != Path::new(DEFAULT_OUTPUT_DIR) {
            parts.push(format!("--output-dir {}", quoted(&self.output_dir)));
        }
        let columns = &self.controller.columns;
        let defaults = SourceColumns::default();
        if columns.name != defaults.name {
            parts.push(format!("--name-column {}", quoted(&columns.name)));
        }
        if columns.payload != defaults.payload {
            parts.push(format!("--payload-column {}", quoted(&columns.payload)));
        }
        parts.join(" ")
    }
}

fn quoted(value: impl AsRef<OsStr>) -> String {
    let text = value.as_ref().to_string_lossy();
    if text.is_empty() || text.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", text.replace('\'', "'\\''"))
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use clap::Parser;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let cli = parse(&["batch-enrich", "run", "software.csv"]);
        let err = AppConfig::from_cli(&cli, env_of(&[])).unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));

        let err = AppConfig::from_cli(&cli, env_of(&[(API_KEY_VAR, "   ")])).unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn flags_flow_into_controller_settings() {
        let cli = parse(&[
            "batch-enrich",
            "run",
            "software.csv",
            "--progress-file",
            "p.json",
            "--cooldown-every",
            "10",
            "--cooldown-secs",
            "2",
            "--name-column",
            "tool",
            "--verbose",
        ]);
        let config = AppConfig::from_cli(&cli, env_of(&[(API_KEY_VAR, "sk-test")])).unwrap();

        assert_eq!(
            config.invocation,
            Invocation::Run {
                input: PathBuf::from("software.csv")
            }
        );
        assert_eq!(config.controller.progress_path, PathBuf::from("p.json"));
        assert_eq!(config.controller.pacing.cooldown_every, 10);
        assert_eq!(config.controller.pacing.cooldown, Duration::from_secs(2));
        assert_eq!(config.controller.columns.name, "tool");
        assert_eq!(config.controller.columns.payload, "description");
        assert_eq!(config.enrich.api_key, "sk-test");
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn model_flag_beats_environment() {
        let env = env_of(&[
            (API_KEY_VAR, "sk-test"),
            (MODEL_VAR, "env-model"),
            (BASE_URL_VAR, "http://localhost:9999"),
        ]);

        let config = AppConfig::from_cli(&parse(&["batch-enrich", "retry"]), &env).unwrap();
        assert_eq!(config.invocation, Invocation::Retry);
        assert_eq!(config.enrich.model, "env-model");
        assert_eq!(config.enrich.base_url, "http://localhost:9999");

        let config = AppConfig::from_cli(
            &parse(&["batch-enrich", "retry", "--model", "flag-model"]),
            &env,
        )
        .unwrap();
        assert_eq!(config.enrich.model, "flag-model");
    }

    #[test]
    fn retry_command_repeats_non_default_locations() {
        let env = env_of(&[(API_KEY_VAR, "k")]);
        let config = AppConfig::from_cli(&parse(&["batch-enrich", "run", "a.csv"]), &env).unwrap();
        assert_eq!(
            config.retry_command(),
            "batch-enrich retry --progress-file enrichment_progress.json --failed-file enrichment_failed.csv"
        );

        let cli = parse(&[
            "batch-enrich",
            "run",
            "a.csv",
            "--progress-file",
            "runs/my progress.json",
            "--name-column",
            "tool",
            "--output-dir",
            "out",
        ]);
        let config = AppConfig::from_cli(&cli, &env).unwrap();
        assert_eq!(
            config.retry_command(),
            "batch-enrich retry --progress-file 'runs/my progress.json' \
             --failed-file enrichment_failed.csv --output-dir out --name-column tool"
        );
    }

    #[test]
    fn identical_columns_are_rejected() {
        let cli = parse(&[
            "batch-enrich",
            "run",
            "a.csv",
            "--name-column",
            "x",
            "--payload-column",
            "x",
        ]);
        assert!(AppConfig::from_cli(&cli, env_of(&[(API_KEY_VAR, "k")])).is_err());
    }
}
