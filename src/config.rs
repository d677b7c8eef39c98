use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::prelude::*;
use crate::process::DEFAULT_PROC_ROOT;
use nestify::nest;
use serde::{Deserialize, Serialize};

nest! {
    #[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent defaults for proctree.
    ///
    /// Stored at `~/.config/proctree/config.yaml` (or under `$XDG_CONFIG_HOME`).
    /// Every key is optional. Command line flags override these values in
    /// both directions, e.g. `--no-show-pids` turns off `show-pids: true`.
    pub struct ProctreeConfig {
        pub display: pub struct DisplayConfig {
            pub show_pids: bool,
            pub numeric_sort: bool,
        },
        pub snapshot: pub struct SnapshotConfig {
            pub proc_root: Option<PathBuf>,
            pub strict: bool,
        },
    }
}

/// Get the path to the configuration file, following the XDG Base Directory Specification
/// at https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
fn get_configuration_file_path() -> Option<PathBuf> {
    let config_dir = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;

    Some(config_dir.join("proctree").join("config.yaml"))
}

/// Options given on the command line, merged on top of [`ProctreeConfig`].
///
/// `None` keeps the configured value.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub show_pids: Option<bool>,
    pub numeric_sort: Option<bool>,
    pub proc_root: Option<PathBuf>,
    pub strict: Option<bool>,
}

impl ProctreeConfig {
    /// Load the configuration. If it does not exist, return a default configuration.
    pub fn load() -> Result<Self> {
        match get_configuration_file_path() {
            Some(config_path) => Self::load_from(&config_path),
            None => {
                debug!("No HOME or XDG_CONFIG_HOME set, using the default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        match fs::read(config_path) {
            Ok(config_str) if config_str.trim_ascii().is_empty() => {
                debug!("Config file at {} is empty", config_path.display());
                Ok(ProctreeConfig::default())
            }
            Ok(config_str) => {
                let config: ProctreeConfig =
                    serde_yaml::from_slice(&config_str).context(format!(
                        "Failed to parse proctree config at {}",
                        config_path.display()
                    ))?;
                debug!("Config loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                Ok(ProctreeConfig::default())
            }
            Err(e) => bail!("Failed to load config: {e}"),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(show_pids) = overrides.show_pids {
            self.display.show_pids = show_pids;
        }
        if let Some(numeric_sort) = overrides.numeric_sort {
            self.display.numeric_sort = numeric_sort;
        }
        if let Some(strict) = overrides.strict {
            self.snapshot.strict = strict;
        }
        if let Some(proc_root) = overrides.proc_root {
            self.snapshot.proc_root = Some(proc_root);
        }
        self
    }

    pub fn proc_root(&self) -> &Path {
        self.snapshot
            .proc_root
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_PROC_ROOT))
    }
}
