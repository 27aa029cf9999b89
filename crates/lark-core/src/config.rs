use lark_provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized settings from ~/.lark/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider used when a caller names none.
    pub default_provider: String,
    /// Model used with the default provider when a caller names none.
    pub default_model: Option<String>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_string(),
            default_model: None,
            providers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Fill absent API keys and base URLs for `names` from `<NAME>_API_KEY`
    /// and `<NAME>_BASE_URL`. Values already in the file win.
    pub fn apply_env<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.apply_vars(names, |var| std::env::var(var).ok());
    }

    fn apply_vars<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) {
        for name in names {
            let prefix = env_prefix(name);
            let api_key = lookup(&format!("{prefix}_API_KEY")).filter(|v| !v.is_empty());
            let base_url = lookup(&format!("{prefix}_BASE_URL")).filter(|v| !v.is_empty());
            if api_key.is_none() && base_url.is_none() {
                continue;
            }

            let entry = self.providers.entry(name.to_string()).or_default();
            if entry.api_key.is_none() {
                entry.api_key = api_key;
            }
            if entry.base_url.is_none() {
                entry.base_url = base_url;
            }
            tracing::debug!(provider = name, "provider settings taken from environment");
        }
    }
}

/// `openai-compat` → `OPENAI_COMPAT`
fn env_prefix(name: &str) -> String {
    name.to_uppercase().replace(['-', '.'], "_")
}

/// Location of the user's config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFile {
    pub fn new() -> Self {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".lark");
        path.push("config.json");
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the user's saved config, or fall back to the default when the
    /// file is missing or unreadable.
    pub fn load(&self) -> Config {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Config::default(),
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "ignoring unparsable config file");
                Config::default()
            }
        }
    }

    /// Save the config back to disk
    pub fn save(&self, config: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config =
            serde_json::from_str(r#"{"providers": {"deepseek": {"api_key": "k"}}}"#).unwrap();
        assert_eq!(parsed.default_provider, "openai");
        assert!(parsed.default_model.is_none());
        assert_eq!(parsed.providers["deepseek"].api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::at(dir.path().join("nested/config.json"));
        let mut config = Config {
            default_provider: "qwen".to_string(),
            default_model: Some("qwen-max".to_string()),
            ..Default::default()
        };
        config
            .providers
            .insert("qwen".to_string(), ProviderConfig::new("sk-q"));
        file.save(&config).unwrap();
        assert_eq!(file.load(), config);
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::at(dir.path().join("config.json"));
        assert_eq!(file.load(), Config::default());

        std::fs::write(file.path(), "{not json").unwrap();
        assert_eq!(file.load(), Config::default());
    }

    #[test]
    fn test_env_fills_absent_values_only() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_BASE_URL", "http://proxy"),
            ("OPENAI_COMPAT_API_KEY", "sk-compat"),
            ("DEEPSEEK_API_KEY", ""),
        ]);
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig::new("sk-file"),
        );
        config.apply_vars(["openai", "openai-compat", "deepseek"], |var| {
            vars.get(var).map(|v| v.to_string())
        });

        let openai = &config.providers["openai"];
        assert_eq!(openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(openai.base_url.as_deref(), Some("http://proxy"));
        assert_eq!(
            config.providers["openai-compat"].api_key.as_deref(),
            Some("sk-compat")
        );
        assert!(!config.providers.contains_key("deepseek"));
    }
}
