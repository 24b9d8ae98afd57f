//! Layered configuration loading.

use crate::{PalisadeConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Builds a [`PalisadeConfig`] from layered sources.
///
/// Later layers win: built-in defaults, the per-user `config.toml`,
/// `palisade.toml`, `palisade.local.toml`, then environment variables such
/// as `PALISADE_CACHE_CAPACITY`. Relative paths resolve against the project
/// directory.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Loader rooted at the working directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "PALISADE".to_string(),
            user_config: true,
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Prefix for environment overrides. `PALISADE` unless set.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// TOML layers that exist on disk, lowest precedence first.
    fn config_files(&self) -> Vec<PathBuf> {
        let user = if self.user_config {
            Paths::new().user_config_file().ok()
        } else {
            None
        };
        user.into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|path| path.exists())
            .collect()
    }

    /// Merges every layer, then resolves paths and validates the result.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, environment values of the wrong type, or a
    /// merged config that does not validate.
    pub fn load(self) -> Result<PalisadeConfig> {
        let defaults = config::Config::try_from(&PalisadeConfig::default())?;
        let builder = self.config_files().into_iter().fold(
            config::Config::builder().add_source(defaults),
            |builder, path| {
                builder.add_source(config::File::from(path).format(config::FileFormat::Toml))
            },
        );

        let merged = builder
            .add_source(
                config::Environment::with_prefix(&self.env_prefix)
                    .separator("_")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut palisade_config: PalisadeConfig = merged
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        palisade_config.resolve_paths(&self.project_dir);
        palisade_config.validate()?;

        Ok(palisade_config)
    }

    /// [`load`](Self::load), or the defaults if anything goes wrong.
    pub fn load_or_default(self) -> PalisadeConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        // A prefix nobody sets keeps the host environment out of the test.
        ConfigLoader::new()
            .with_project_dir(dir)
            .with_env_prefix("PALISADE_TEST_UNSET")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 1024);
        assert_eq!(config.rules.path, temp_dir.path().join("rules.json"));
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[cache]
capacity = 64

[rules]
path = "policy/rules.json"

[logging]
filter = "palisade_rbac=debug"
"#;
        fs::write(project_dir.join("palisade.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.cache.capacity, 64);
        assert!(config.cache.enabled);
        assert_eq!(config.rules.path, project_dir.join("policy/rules.json"));
        assert_eq!(config.logging.filter, "palisade_rbac=debug");
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("palisade.toml"),
            r"
[cache]
enabled = true
capacity = 64
",
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("palisade.local.toml"),
            r"
[cache]
enabled = false
",
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.capacity, 64);
        assert_eq!(config.effective_cache_capacity(), 0);
    }

    #[test]
    fn test_config_files_in_precedence_order() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        let loader = loader(project_dir);

        assert!(loader.config_files().is_empty());

        fs::write(project_dir.join("palisade.local.toml"), "").expect("Failed to write config");
        fs::write(project_dir.join("palisade.toml"), "").expect("Failed to write config");

        assert_eq!(
            loader.config_files(),
            vec![
                project_dir.join("palisade.toml"),
                project_dir.join("palisade.local.toml"),
            ]
        );
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("palisade.toml"), "[cache\ncapacity = ")
            .expect("Failed to write config");

        assert!(loader(temp_dir.path()).load().is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(project_dir.join("palisade.toml"), "[logging]\nfilter = \"\"\n")
            .expect("Failed to write config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(
            loader(project_dir).load_or_default(),
            PalisadeConfig::default()
        );
    }

    // Environment overrides (PALISADE_CACHE_CAPACITY=64, PALISADE_RULES_PATH=...)
    // are not exercised here: tests run in parallel and share the process
    // environment.
}
