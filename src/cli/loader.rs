use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::daemon::DaemonConfig;
use crate::error::HearthError;

use super::args::Args;
use super::config::ConfigFile;

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub rules_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub daemon: DaemonConfig,
    pub enforcement_poll_interval: Duration,
    pub redirect_url: Option<String>,
    pub lexicon: HashMap<String, String>,
}

/// Merge settings from the config file and command line arguments.
/// CLI values win over file values, file values win over defaults.
pub struct SettingsLoader;

impl SettingsLoader {
    pub fn load(args: &Args) -> Result<Settings, HearthError> {
        let config = match args.config.as_ref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let sync_interval = args
            .sync_interval_secs
            .unwrap_or(config.daemon.sync_interval_secs);

        Ok(Settings {
            rules_path: args.rules.clone().unwrap_or(config.rules.path),
            snapshot_path: args.snapshot.clone().unwrap_or(config.sync.snapshot_path),
            daemon: DaemonConfig {
                sync_interval: Duration::from_secs(sync_interval),
                classifier_timeout: Duration::from_millis(config.daemon.classifier_timeout_ms),
            },
            enforcement_poll_interval: Duration::from_secs(config.enforcement.poll_interval_secs),
            redirect_url: config.enforcement.redirect_url,
            lexicon: config.classifier.lexicon,
        })
    }
}
