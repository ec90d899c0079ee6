pub mod error;

pub use error::*;

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A configuration document loaded from a JSON file.
///
/// The document is a flat string-keyed mapping with no schema. Keys are
/// not validated at load time; a key that turns out to be missing (or to
/// hold the wrong type) fails at the point of access instead.
#[derive(Debug, Clone)]
pub struct Configuration {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Configuration {
    /// Load a configuration from a JSON file.
    ///
    /// The file must contain a JSON object at the top level. Either the
    /// whole document parses or the load fails; a partial mapping is
    /// never returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let document: Value =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let values = match document {
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::NotAnObject {
                    path: path.to_path_buf(),
                });
            }
        };

        tracing::debug!(
            "Loaded config {} with {} keys",
            path.display(),
            values.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Path this configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for a key.
    ///
    /// Fails with [`ConfigError::KeyMissing`] when the key is absent and
    /// [`ConfigError::InvalidValue`] when it holds a non-string.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            None => Err(ConfigError::KeyMissing(key.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// String value for a key, or `None` when the key is absent.
    ///
    /// A present key with a non-string value is still an error.
    pub fn get_str_opt(&self, key: &str) -> Result<Option<&str>> {
        match self.get_str(key) {
            Ok(s) => Ok(Some(s)),
            Err(ConfigError::KeyMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Top-level keys, in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Find a config file by name.
///
/// Search priority:
/// 1. VMSTACK_CONFIG_PATH environment variable (direct path)
/// 2. the current directory
/// 3. ./.vmstack/ directory
/// 4. ~/.config/vmstack/ (global config)
pub fn find_config_file(file_name: &str) -> Result<PathBuf> {
    // 1. direct path via environment variable
    if let Ok(config_path) = std::env::var("VMSTACK_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. current directory
    let current_dir = std::env::current_dir().map_err(|source| ConfigError::Read {
        path: PathBuf::from("."),
        source,
    })?;
    let path = current_dir.join(file_name);
    if path.exists() {
        return Ok(path);
    }

    // 3. ./.vmstack/ directory
    let vmstack_dir = current_dir.join(".vmstack");
    if vmstack_dir.is_dir() {
        let path = vmstack_dir.join(file_name);
        if path.exists() {
            return Ok(path);
        }
    }

    // 4. global config (~/.config/vmstack/)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("vmstack").join(file_name);
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"projectName":"p","stackName":"s","vmSize":"Standard_B2s","nested":{"a":1}}"#,
        )
        .unwrap();

        let config = Configuration::load(&path).unwrap();

        let mut keys: Vec<_> = config.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["nested", "projectName", "stackName", "vmSize"]);
        assert_eq!(config.get_str("projectName").unwrap(), "p");
        assert_eq!(config.get("nested").unwrap()["a"], 1);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = Configuration::load(temp_dir.path().join("nope.json"));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_malformed_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"projectName": "p",}"#).unwrap();

        let result = Configuration::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_non_object() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"["not", "an", "object"]"#).unwrap();

        let result = Configuration::load(&path);
        assert!(matches!(result, Err(ConfigError::NotAnObject { .. })));
    }

    #[test]
    fn test_key_missing_at_first_use() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"vmName":"vm-01"}"#).unwrap();

        // load succeeds even though keys the caller may want are absent
        let config = Configuration::load(&path).unwrap();

        match config.get_str("snapshotName") {
            Err(ConfigError::KeyMissing(key)) => assert_eq!(key, "snapshotName"),
            other => panic!("expected KeyMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"vmSize": 42}"#).unwrap();

        let config = Configuration::load(&path).unwrap();
        assert!(matches!(
            config.get_str("vmSize"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("config.json"), "{}").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file("config.json");
        assert!(result.is_ok());
        assert!(result.unwrap().ends_with("config.json"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_vmstack_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let vmstack_dir = temp_dir.path().join(".vmstack");
        fs::create_dir(&vmstack_dir).unwrap();
        fs::write(vmstack_dir.join("config_snapshot.json"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file("config_snapshot.json").unwrap();
        assert!(result.ends_with(".vmstack/config_snapshot.json"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.json");
        fs::write(&config_path, "{}").unwrap();

        unsafe {
            std::env::set_var("VMSTACK_CONFIG_PATH", config_path.to_str().unwrap());
        }

        let result = find_config_file("config.json").unwrap();
        assert_eq!(result, config_path);

        unsafe {
            std::env::remove_var("VMSTACK_CONFIG_PATH");
        }
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file("does-not-exist.json");
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));

        std::env::set_current_dir(original_dir).unwrap();
    }
}
