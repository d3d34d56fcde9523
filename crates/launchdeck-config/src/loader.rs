//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        Self::expand_paths(&mut config);
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::InvalidValue {
            field: "env".to_string(),
            message: e.to_string(),
        })?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    fn expand_paths(config: &mut Config) {
        config.registry.path = Self::expand_path_buf(&config.registry.path);
        config.launchd.agents_dir = Self::expand_path_buf(&config.launchd.agents_dir);
        config.logging.dir = Self::expand_path_buf(&config.logging.dir);
        config.logging.task_logs_dir = Self::expand_path_buf(&config.logging.task_logs_dir);
        if let Some(dir) = config.runner.working_dir.take() {
            config.runner.working_dir = Some(Self::expand_path_buf(&dir));
        }
    }

    fn expand_path_buf(path: &Path) -> PathBuf {
        PathBuf::from(Self::expand_path(&path.to_string_lossy()))
    }

    /// Expand shell-style paths (e.g., `~/Library`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.server.port, 3030);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [server]
            host = "0.0.0.0"
            port = 4000

            [registry]
            path = "/srv/launchdeck/tasks.json"

            [launchd]
            agents_dir = "/tmp/agents"
            label_prefixes = ["com.example."]
            launchctl = "/bin/launchctl"

            [launchd.display_names]
            "com.example.brief" = "Daily Brief"

            [runner]
            interpreter = ""
            working_dir = "/tmp"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.registry.path, PathBuf::from("/srv/launchdeck/tasks.json"));
        assert_eq!(config.launchd.label_prefixes, vec!["com.example."]);
        assert_eq!(
            config.launchd.display_names.get("com.example.brief").map(String::as_str),
            Some("Daily Brief")
        );
        assert!(config.runner.interpreter.is_empty());
        assert_eq!(config.runner.working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_tilde_paths_are_expanded() {
        let content = r#"
            [launchd]
            agents_dir = "~/Library/LaunchAgents"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.launchd.agents_dir.to_string_lossy().starts_with('~'));
        assert!(config.launchd.agents_dir.ends_with("Library/LaunchAgents"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "port = 5000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/launchdeck.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/launchdeck.toml")).unwrap();
        assert_eq!(config.server.port, 3030);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: unique test-only variable name
        unsafe {
            std::env::set_var("LAUNCHDECK_TEST_CONFIG_VAR", "test_value");
        }
        let content = "value = \"${LAUNCHDECK_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("LAUNCHDECK_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${LAUNCHDECK_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
    }
}
