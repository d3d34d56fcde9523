//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_launchd(config, &mut result);
        Self::validate_runner(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_launchd(config: &Config, result: &mut ValidationResult) {
        if config.launchd.label_prefixes.is_empty() {
            result.add_error(ValidationError::new(
                "launchd.label_prefixes",
                "At least one label prefix is required",
            ));
        }

        if config.launchd.label_prefixes.iter().any(|p| p.is_empty()) {
            result.add_error(ValidationError::new(
                "launchd.label_prefixes",
                "An empty prefix would claim every LaunchAgent",
            ));
        }

        if config.launchd.launchctl.is_empty() {
            result.add_error(ValidationError::new(
                "launchd.launchctl",
                "launchctl program cannot be empty",
            ));
        }

        for label in config.launchd.display_names.keys() {
            let owned = config
                .launchd
                .label_prefixes
                .iter()
                .any(|p| label.starts_with(p.as_str()));
            if !owned {
                result.add_warning(ValidationWarning::new(
                    format!("launchd.display_names.{}", label),
                    "Label does not match any owned prefix and will never be shown",
                ));
            }
        }
    }

    fn validate_runner(config: &Config, result: &mut ValidationResult) {
        if let Some(dir) = &config.runner.working_dir {
            if !dir.is_absolute() {
                result.add_warning(ValidationWarning::new(
                    "runner.working_dir",
                    "Relative working directory is resolved against the server's cwd",
                ));
            }
        }
    }
}
