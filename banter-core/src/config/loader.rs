//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment overrides applied on top of the config file
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("BANTER_HOST", "server.host"),
    ("BANTER_PORT", "server.port"),
    ("BANTER_PUBLIC_DIR", "server.public_dir"),
    ("BANTER_DB_PATH", "store.path"),
    ("BANTER_API_BASE", "upstream.api_base"),
    ("BANTER_MODEL", "upstream.model"),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".banter"))
            .unwrap_or_else(|| PathBuf::from(".banter"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_env_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_dir.join("config.json");
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn apply_env_overrides(config: &mut Value) {
    for (var, path) in ENV_OVERRIDES {
        if let Ok(raw) = std::env::var(var) {
            if raw.trim().is_empty() {
                continue;
            }
            let segments: Vec<String> = path.split('.').map(|s| s.to_string()).collect();
            set_path_value(config, &segments, parse_env_value(&raw));
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Number(v.into());
    }
    if let Ok(v) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(v) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }

    let mut current = root;
    for segment in &path[..path.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().expect("object ensured");
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(path[path.len() - 1].clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.model, "grok-beta");
        assert_eq!(config.store.path, "banter.db");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"server": {"port": 8080}, "upstream": {"model": "grok-2"}}"#,
        )
        .unwrap();

        let loader = ConfigLoader::with_dir(dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.model, "grok-2");
        // Untouched sections keep their defaults
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.upstream.api_base, "https://api.x.ai/v1");
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());

        let mut config = Config::default();
        config.store.path = "custom.db".to_string();
        loader.save(&config).unwrap();

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.store.path, "custom.db");
    }

    #[test]
    fn test_parse_env_value_types() {
        assert_eq!(parse_env_value("8080"), Value::Number(8080.into()));
        assert_eq!(parse_env_value("true"), Value::Bool(true));
        assert_eq!(
            parse_env_value("grok-beta"),
            Value::String("grok-beta".to_string())
        );
    }
}
