use crate::error::ConfigError;
use std::{collections::HashMap, fs, path::Path};

pub const ENV_CONTACT_POINTS: &str = "CQL_CONTACT_POINTS";
pub const ENV_USERNAME: &str = "CQL_USERNAME";
pub const ENV_PASSWORD: &str = "CQL_PASSWORD";
pub const ENV_LOCAL_DC: &str = "CQL_LOCAL_DC";
pub const ENV_TABLE: &str = "CQL_TABLE";

/// Environment variable manager that loads from the process and .env files.
///
/// Values from a loaded file shadow process variables of the same name.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
    sensitive_patterns: Vec<String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
            sensitive_patterns: Self::default_sensitive_patterns(),
        }
    }

    /// A manager that ignores the process environment.
    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
            sensitive_patterns: Self::default_sensitive_patterns(),
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::EnvFile(format!("failed to read {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    /// Loads `path` if it exists. Returns whether anything was loaded.
    pub fn load_optional<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, ConfigError> {
        if !path.as_ref().is_file() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.sensitive_patterns.iter().any(|p| key.contains(p))
    }

    /// The value of `key` as safe to log.
    pub fn display_value(&self, key: &str) -> Option<String> {
        let value = self.get(key)?;
        if self.is_sensitive(key) {
            Some("***".to_string())
        } else {
            Some(value.to_string())
        }
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::EnvFile(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::EnvFile(format!(
                    "empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }

        value.to_string()
    }

    fn default_sensitive_patterns() -> Vec<String> {
        ["password", "passwd", "secret", "token", "credential", "private"]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_env() {
        let mut env = EnvManager::empty();
        let content = r#"
# Comment
CQL_TABLE=ks.t
export CQL_LOCAL_DC=dc2
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get(ENV_TABLE), Some("ks.t"));
        assert_eq!(env.get(ENV_LOCAL_DC), Some("dc2"));
    }

    #[test]
    fn test_parse_quoted_values() {
        let mut env = EnvManager::empty();
        let content = r#"
QUOTED="value with spaces"
SINGLE='single quoted'
EMPTY=
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED"), Some("value with spaces"));
        assert_eq!(env.get("SINGLE"), Some("single quoted"));
        assert_eq!(env.get("EMPTY"), None);
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = EnvManager::empty();
        assert!(env.parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn test_password_is_masked() {
        let mut env = EnvManager::empty();
        env.set(ENV_PASSWORD, "hunter2");
        env.set(ENV_USERNAME, "cassandra");
        assert_eq!(env.display_value(ENV_PASSWORD).as_deref(), Some("***"));
        assert_eq!(env.display_value(ENV_USERNAME).as_deref(), Some("cassandra"));
    }
}
