//! Application configuration management utilities.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

use ltk_repath::{RepathRules, DEFAULT_PREFIX_PERCENT};

/// Application-wide configuration stored in repath.toml.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// `<hash> <path>` listing (file or directory) used as the fallback corpus.
    pub hashes_path: Option<Utf8PathBuf>,
    /// `<hex hash> <path>` listing of shader definitions.
    pub shader_hashes_path: Option<Utf8PathBuf>,
    /// Archives searched when no `--source` is given, in priority order.
    pub game_archives: Vec<Utf8PathBuf>,
    pub prefix_percent: f64,
    pub repath_prefix: String,
    pub in_file_path: bool,
    pub clean_root: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hashes_path: None,
            shader_hashes_path: None,
            game_archives: Vec::new(),
            prefix_percent: DEFAULT_PREFIX_PERCENT,
            repath_prefix: String::new(),
            in_file_path: true,
            clean_root: true,
        }
    }
}

impl AppConfig {
    pub fn repath_rules(&self) -> RepathRules {
        RepathRules {
            prefix: self.repath_prefix.clone(),
            in_file_path: self.in_file_path,
            clean_root: self.clean_root,
        }
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (repath.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("repath.toml"))
}

/// Loads the configuration from `path`, or from the default location.
/// Returns the default configuration if the file doesn't exist or cannot be parsed.
pub fn load_config(path: Option<&Utf8Path>) -> AppConfig {
    let Some(path) = path.map(Utf8Path::to_path_buf).or_else(default_config_path) else {
        return AppConfig::default();
    };
    if !path.exists() {
        tracing::debug!("No configuration file path={}", path);
        return AppConfig::default();
    }

    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| parse_config(&content))
    {
        Ok(cfg) => {
            tracing::debug!("Loaded configuration path={}", path);
            cfg
        }
        Err(err) => {
            tracing::warn!("Ignoring invalid configuration path={} error={}", path, err);
            AppConfig::default()
        }
    }
}

fn parse_config(content: &str) -> Result<AppConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
repath_prefix = "mymod_"
game_archives = ["Game/DATA/FINAL/Champions/Ahri.wad.client"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.repath_prefix, "mymod_");
        assert_eq!(cfg.game_archives.len(), 1);
        assert_eq!(cfg.prefix_percent, DEFAULT_PREFIX_PERCENT);
        assert!(cfg.in_file_path);
        assert!(cfg.clean_root);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("repath.toml")).unwrap();
        fs::write(&path, "prefix_percent = \"eighty\"").unwrap();
        assert_eq!(load_config(Some(&path)), AppConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Utf8Path::new("definitely/not/here/repath.toml");
        assert_eq!(load_config(Some(path)), AppConfig::default());
    }
}
