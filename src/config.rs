use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::SortOrder;
use crate::pages::FormLinks;

const DEFAULT_ENV_PREFIX: &str = "RECRUIT_BOARD";
const APP_DIR: &str = "recruit-board";

pub const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vRwty1oe-6s7l6GPnMyo-nhQk2vDfnWKsdlzmgdGo1ey7g1QNLusXc_iIbAJYdE8RhLwRnLobvrBvDV/pub?gid=821609257&single=true&output=csv";
pub const DEFAULT_RECRUIT_FORM: &str = "https://docs.google.com/forms/d/e/1FAIpQLSe9ct1JVa42u4tWHIqFQJegyq1s2b2rjiSpc84EBqq65QkLug/viewform";
pub const DEFAULT_CONTACT_FORM: &str = "https://docs.google.com/forms/d/e/1FAIpQLSexVAhliA-a_VG2fiyEZZUGmuBVKxXgtmdIdciqKai-Ki0ssg/viewform?usp=dialog";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            url: default_sheet_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_sheet_url() -> String {
    DEFAULT_SHEET_URL.to_string()
}

fn default_user_agent() -> String {
    format!("recruit-board/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    crate::sheet::DEFAULT_TIMEOUT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UIConfig {
    #[serde(default)]
    pub default_sort: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinksConfig {
    #[serde(default = "default_recruit_form")]
    pub recruit_form: String,
    #[serde(default = "default_contact_form")]
    pub contact_form: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            recruit_form: default_recruit_form(),
            contact_form: default_contact_form(),
        }
    }
}

impl LinksConfig {
    pub fn form_links(&self) -> FormLinks {
        FormLinks {
            recruit_form: self.recruit_form.clone(),
            contact_form: self.contact_form.clone(),
        }
    }
}

fn default_recruit_form() -> String {
    DEFAULT_RECRUIT_FORM.to_string()
}

fn default_contact_form() -> String {
    DEFAULT_CONTACT_FORM.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join("recruit-board.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    debug!(url = %cfg.sheet.url, sort = %cfg.ui.default_sort, "config loaded");
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.sheet.url.trim().is_empty() {
        base.sheet.url = other.sheet.url;
    }
    if !other.sheet.user_agent.trim().is_empty() {
        base.sheet.user_agent = other.sheet.user_agent;
    }
    if !other.sheet.timeout.is_zero() {
        base.sheet.timeout = other.sheet.timeout;
    }

    base.ui.default_sort = other.ui.default_sort;

    if !other.links.recruit_form.trim().is_empty() {
        base.links.recruit_form = other.links.recruit_form;
    }
    if !other.links.contact_form.trim().is_empty() {
        base.links.contact_form = other.links.contact_form;
    }

    if !other.log.level.trim().is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

/// Layers `PREFIX_SECTION__KEY` variables over `cfg`.
fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }
    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    if value.trim().is_empty() {
        return;
    }
    match key {
        "sheet.url" => cfg.sheet.url = value,
        "sheet.user_agent" => cfg.sheet.user_agent = value,
        "sheet.timeout" => {
            if let Ok(duration) = humantime::parse_duration(value.trim()) {
                cfg.sheet.timeout = duration;
            }
        }
        "ui.default_sort" => {
            if let Ok(sort) = value.parse::<SortOrder>() {
                cfg.ui.default_sort = sort;
            }
        }
        "links.recruit_form" => cfg.links.recruit_form = value,
        "links.contact_form" => cfg.links.contact_form = value,
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            config_file: None,
            env_prefix: Some("RB_TEST_DEFAULTS".into()),
        })
        .unwrap();
        assert_eq!(cfg.sheet.timeout, Duration::from_secs(20));
        assert_eq!(cfg.ui.default_sort, SortOrder::Oldest);
        assert!(cfg.sheet.url.ends_with("output=csv"));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "sheet:\n  url: https://example.com/board.csv\n  timeout: 5s\nui:\n  default_sort: newest\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("RB_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.sheet.url, "https://example.com/board.csv");
        assert_eq!(cfg.sheet.timeout, Duration::from_secs(5));
        assert_eq!(cfg.ui.default_sort, SortOrder::Newest);
        assert_eq!(cfg.links.recruit_form, DEFAULT_RECRUIT_FORM);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load(LoadOptions {
            config_file: Some(dir.path().join("absent.yaml")),
            env_prefix: Some("RB_TEST_MISSING".into()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn env_overrides() {
        env::set_var("RB_TEST_ENV_SHEET__URL", "https://example.org/export.csv");
        env::set_var("RB_TEST_ENV_UI__DEFAULT_SORT", "newest");
        env::set_var("RB_TEST_ENV_SHEET__TIMEOUT", "45s");
        let cfg = load(LoadOptions {
            config_file: None,
            env_prefix: Some("RB_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.sheet.url, "https://example.org/export.csv");
        assert_eq!(cfg.ui.default_sort, SortOrder::Newest);
        assert_eq!(cfg.sheet.timeout, Duration::from_secs(45));
        env::remove_var("RB_TEST_ENV_SHEET__URL");
        env::remove_var("RB_TEST_ENV_UI__DEFAULT_SORT");
        env::remove_var("RB_TEST_ENV_SHEET__TIMEOUT");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        env::set_var("RB_TEST_BAD_UI__DEFAULT_SORT", "sideways");
        env::set_var("RB_TEST_BAD_SHEET__TIMEOUT", "soon");
        let cfg = load(LoadOptions {
            config_file: None,
            env_prefix: Some("RB_TEST_BAD".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.default_sort, SortOrder::Oldest);
        assert_eq!(cfg.sheet.timeout, Duration::from_secs(20));
        env::remove_var("RB_TEST_BAD_UI__DEFAULT_SORT");
        env::remove_var("RB_TEST_BAD_SHEET__TIMEOUT");
    }
}
