//! Layered settings for the `generate` and `watch` entry points.
//!
//! Values are resolved from three layers, later layers winning:
//!
//! 1. built-in defaults ([`GraphConfig::default`])
//! 2. the first config file found by [`find_config_file`]
//! 3. explicit values from the caller, usually the command line
//!
//! Config files may be TOML (`markdown-graph.toml`, `.markdown-graph.toml`) or JSON
//! (`markdown-graph.config.json`, `.markdown-graph.json`). Keys are accepted in either
//! `snake_case` or `camelCase`.

use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use crate::{
    codec::BuilderOptions,
    error::GraphError,
    repository::RepositoryOptions,
};

pub const DEFAULT_OUTPUT_FILE: &str = ".garden-graph.json";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_EXCLUDES: [&str; 3] = ["node_modules", "dist", ".git"];

/// Searched in order within each search directory.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "markdown-graph.toml",
    ".markdown-graph.toml",
    "markdown-graph.config.json",
    ".markdown-graph.json",
];

/// One layer of settings. `None` leaves the value of the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(alias = "targetDirectory", skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<PathBuf>,
    #[serde(alias = "outputFile", skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
    #[serde(alias = "includeHidden", skip_serializing_if = "Option::is_none")]
    pub include_hidden: Option<bool>,
    #[serde(alias = "debounceMs", skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(alias = "justNodeNames", skip_serializing_if = "Option::is_none")]
    pub just_node_names: Option<bool>,
    #[serde(alias = "noSections", skip_serializing_if = "Option::is_none")]
    pub no_sections: Option<bool>,
}

impl ConfigOverrides {
    /// `self` with every value set in `over` replaced by it.
    pub fn overlay(self, over: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            target_directory: over.target_directory.or(self.target_directory),
            output_file: over.output_file.or(self.output_file),
            verbose: over.verbose.or(self.verbose),
            quiet: over.quiet.or(self.quiet),
            excludes: over.excludes.or(self.excludes),
            include_hidden: over.include_hidden.or(self.include_hidden),
            debounce_ms: over.debounce_ms.or(self.debounce_ms),
            just_node_names: over.just_node_names.or(self.just_node_names),
            no_sections: over.no_sections.or(self.no_sections),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub target_directory: PathBuf,
    /// Defaults to [`DEFAULT_OUTPUT_FILE`] inside the target directory.
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
    pub excludes: Vec<String>,
    pub include_hidden: bool,
    pub debounce_ms: u64,
    pub just_node_names: bool,
    pub no_sections: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            target_directory: PathBuf::from("."),
            output_file: None,
            verbose: false,
            quiet: false,
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            include_hidden: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            just_node_names: false,
            no_sections: false,
        }
    }
}

impl GraphConfig {
    /// Apply one layer of overrides on top of this config.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(dir) = overrides.target_directory {
            self.target_directory = dir;
        }
        if overrides.output_file.is_some() {
            self.output_file = overrides.output_file;
        }
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        if let Some(quiet) = overrides.quiet {
            self.quiet = quiet;
        }
        if let Some(excludes) = overrides.excludes {
            self.excludes = excludes;
        }
        if let Some(include_hidden) = overrides.include_hidden {
            self.include_hidden = include_hidden;
        }
        if let Some(debounce_ms) = overrides.debounce_ms {
            self.debounce_ms = debounce_ms;
        }
        if let Some(just_node_names) = overrides.just_node_names {
            self.just_node_names = just_node_names;
        }
        if let Some(no_sections) = overrides.no_sections {
            self.no_sections = no_sections;
        }
        self
    }

    /// Resolve defaults, then the config file discovered from `working_dir`, then `cli`.
    pub fn resolve(cli: ConfigOverrides, working_dir: &Path) -> Result<GraphConfig, GraphError> {
        let file_layer = match find_config_file(working_dir) {
            Some(path) => {
                tracing::debug!("Using config file {:?}", path);
                load_config_file(&path)?
            }
            None => ConfigOverrides::default(),
        };
        let config = GraphConfig::default().apply(file_layer.overlay(cli));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.verbose && self.quiet {
            return Err(GraphError::Configuration(
                "verbose and quiet cannot both be set".to_string(),
            ));
        }
        if self.debounce_ms == 0 {
            return Err(GraphError::Configuration(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.excludes.iter().any(|x| x.trim().is_empty()) {
            return Err(GraphError::Configuration(
                "exclude patterns must not be empty".to_string(),
            ));
        }
        if matches!(&self.output_file, Some(path) if path.as_os_str().is_empty()) {
            return Err(GraphError::Configuration(
                "output file path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Default log filter for these settings when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| self.target_directory.join(DEFAULT_OUTPUT_FILE))
    }

    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            just_node_names: self.just_node_names,
            no_sections: self.no_sections,
        }
    }

    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions::File {
            path: Some(self.target_directory.clone()),
            excludes: Some(self.excludes.clone()),
            include_hidden: self.include_hidden,
            output_path: Some(self.output_path()),
            builder: self.builder_options(),
        }
    }

    #[cfg(feature = "service")]
    pub fn watch_options(&self) -> crate::watch::WatchOptions {
        crate::watch::WatchOptions {
            target_directory: self.target_directory.clone(),
            output_file: self.output_path(),
            excludes: self.excludes.clone(),
            include_hidden: self.include_hidden,
            debounce_ms: self.debounce_ms,
            builder: self.builder_options(),
            ..Default::default()
        }
    }
}

/// The first config file in `dir`, `dir/.config` or the parent of `dir`.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    let mut search_dirs = vec![dir.to_path_buf(), dir.join(".config")];
    if let Some(parent) = dir.parent() {
        search_dirs.push(parent.to_path_buf());
    }
    search_dirs.iter().find_map(|search_dir| {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| search_dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

pub fn load_config_file(path: &Path) -> Result<ConfigOverrides, GraphError> {
    let content = read_to_string(path)?;
    let is_toml = path
        .extension()
        .map(|ext| ext == "toml")
        .unwrap_or(false);
    if is_toml {
        Ok(toml::from_str(&content)?)
    } else {
        serde_json::from_str(&content).map_err(|e| {
            GraphError::Configuration(format!("Invalid JSON in {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = GraphConfig::default();
        config.validate().unwrap();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.excludes, vec!["node_modules", "dist", ".git"]);
        assert_eq!(config.output_path(), PathBuf::from("./.garden-graph.json"));
    }

    #[test]
    fn cli_beats_file_beats_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("markdown-graph.toml"),
            "debounce_ms = 50\ninclude_hidden = true\nexcludes = [\"build\"]\n",
        )
        .unwrap();
        let cli = ConfigOverrides {
            debounce_ms: Some(75),
            ..Default::default()
        };
        let config = GraphConfig::resolve(cli, dir.path()).unwrap();
        assert_eq!(config.debounce_ms, 75);
        assert!(config.include_hidden);
        assert_eq!(config.excludes, vec!["build"]);
        assert!(!config.verbose);
    }

    #[test]
    fn verbosity_from_the_config_file_sets_the_log_level() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("markdown-graph.toml"), "verbose = true\n").unwrap();
        let config = GraphConfig::resolve(ConfigOverrides::default(), dir.path()).unwrap();
        assert_eq!(config.log_level(), "debug");

        let quiet = ConfigOverrides {
            verbose: Some(false),
            quiet: Some(true),
            ..Default::default()
        };
        let config = GraphConfig::resolve(quiet, dir.path()).unwrap();
        assert_eq!(config.log_level(), "error");
        assert_eq!(GraphConfig::default().log_level(), "info");
    }

    #[test]
    fn json_files_accept_camel_case() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".config")).unwrap();
        fs::write(
            dir.path().join(".config").join(".markdown-graph.json"),
            r#"{ "outputFile": "graph.json", "justNodeNames": true }"#,
        )
        .unwrap();
        let config = GraphConfig::resolve(ConfigOverrides::default(), dir.path()).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("graph.json"));
        assert!(config.just_node_names);
    }

    #[test]
    fn working_directory_wins_over_parent() {
        let parent = tempdir().unwrap();
        let child = parent.path().join("notes");
        fs::create_dir(&child).unwrap();
        fs::write(parent.path().join("markdown-graph.toml"), "debounce_ms = 10\n").unwrap();
        assert_eq!(
            find_config_file(&child),
            Some(parent.path().join("markdown-graph.toml"))
        );

        fs::write(child.join(".markdown-graph.toml"), "debounce_ms = 20\n").unwrap();
        let config = GraphConfig::resolve(ConfigOverrides::default(), &child).unwrap();
        assert_eq!(config.debounce_ms, 20);
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let cases = [
            ConfigOverrides {
                verbose: Some(true),
                quiet: Some(true),
                ..Default::default()
            },
            ConfigOverrides {
                debounce_ms: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                excludes: Some(vec!["".to_string()]),
                ..Default::default()
            },
            ConfigOverrides {
                output_file: Some(PathBuf::new()),
                ..Default::default()
            },
        ];
        for overrides in cases {
            let err = GraphConfig::default().apply(overrides).validate().err();
            assert!(matches!(err, Some(GraphError::Configuration(_))));
        }
    }

    #[test]
    fn malformed_files_are_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("markdown-graph.config.json"), "{ nope").unwrap();
        let err = GraphConfig::resolve(ConfigOverrides::default(), dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, GraphError::Configuration(_)));
    }
}
