use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tally_core::time::parse_timezone;
use tally_core::{MoneyFormat, UserId};

use crate::state::{default_store_path, ensure_tally_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user: UserSection,
    pub display: DisplaySection,
    pub store: StoreSection,
    pub llm: LlmSection,
    pub chat: ChatSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub locale: String,
    pub currency: String,
    /// IANA name; period boundaries are computed in this zone
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Firestore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: Backend,
    /// For backend = "file" (default: ~/.tally/tally.json)
    pub path: Option<PathBuf>,
    /// For backend = "firestore"
    pub project_id: Option<String>,
    /// Environment variable holding the Firebase ID token
    pub id_token_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub max_turns_context: usize,
}

impl Default for UserSection {
    fn default() -> Self {
        Self {
            id: "local".to_string(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            locale: "pt-BR".to_string(),
            currency: "BRL".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            path: None,
            project_id: None,
            id_token_env: "TALLY_FIREBASE_ID_TOKEN".to_string(),
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.7,
        }
    }
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            max_turns_context: 20,
        }
    }
}

impl Config {
    /// `--user` wins over the configured id.
    pub fn user_id(&self, cli_user: Option<&str>) -> UserId {
        UserId::new(cli_user.unwrap_or(&self.user.id))
    }

    pub fn money_format(&self) -> Result<MoneyFormat> {
        MoneyFormat::parse(&self.display.locale, &self.display.currency)
            .context("invalid [display] locale/currency in config.toml")
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.display.timezone).context("invalid [display] timezone in config.toml")
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(p) => Ok(p.clone()),
            None => default_store_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_from(&config_path()?)
}

/// Missing file means defaults; missing keys fall back individually.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_to(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Currency, Locale};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.llm.model, "gemini-1.5-pro");

        let money = cfg.money_format().unwrap();
        assert_eq!(money.locale(), Locale::PtBr);
        assert_eq!(money.currency(), Currency::Brl);
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::America::Sao_Paulo);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[display]\nlocale = \"en-US\"\ncurrency = \"USD\"\n\n[store]\nbackend = \"firestore\"\nproject_id = \"tally-prod\"\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.display.locale, "en-US");
        assert_eq!(cfg.display.timezone, "America/Sao_Paulo");
        assert_eq!(cfg.store.backend, Backend::Firestore);
        assert_eq!(cfg.store.project_id.as_deref(), Some("tally-prod"));
        assert_eq!(cfg.store.id_token_env, "TALLY_FIREBASE_ID_TOKEN");
        assert_eq!(cfg.chat.max_turns_context, 20);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.user.id = "ana".to_string();
        cfg.store.path = Some(dir.path().join("data.json"));
        save_to(&cfg, &path).unwrap();

        assert_eq!(load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn test_cli_user_overrides_config() {
        let cfg = Config::default();
        assert_eq!(cfg.user_id(None).as_str(), "local");
        assert_eq!(cfg.user_id(Some("bia")).as_str(), "bia");
    }

    #[test]
    fn test_bad_locale_is_reported() {
        let mut cfg = Config::default();
        cfg.display.locale = "xx-YY".to_string();
        assert!(cfg.money_format().is_err());
    }
}
