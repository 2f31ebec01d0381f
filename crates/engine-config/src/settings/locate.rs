use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Looked up in order; the private file lets local credentials stay out of
/// version control.
pub const CONFIG_CANDIDATES: [&str; 2] = ["connection-private.json", "connection.json"];

/// First existing candidate file in `dir`.
pub fn locate_config(dir: &Path) -> Result<PathBuf, ConfigError> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            candidates: CONFIG_CANDIDATES
                .iter()
                .map(|name| dir.join(name).display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn prefers_private_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("connection.json"), "{}").unwrap();
        assert_eq!(
            locate_config(dir.path()).unwrap(),
            dir.path().join("connection.json")
        );

        fs::write(dir.path().join("connection-private.json"), "{}").unwrap();
        assert_eq!(
            locate_config(dir.path()).unwrap(),
            dir.path().join("connection-private.json")
        );
    }

    #[test]
    fn reports_all_candidates_when_none_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_config(dir.path()).unwrap_err();
        let ConfigError::NotFound { candidates } = err else {
            panic!("expected NotFound");
        };
        assert!(candidates.contains("connection-private.json"));
        assert!(candidates.contains("connection.json"));
    }
}
