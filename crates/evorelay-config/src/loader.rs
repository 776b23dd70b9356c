use std::path::{Path, PathBuf};

use evorelay_common::{Error, Result};
use tracing::debug;

use crate::model::{AppConfig, StoreBackend};

/// Environment variable that points at an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "EVORELAY_CONFIG";

/// Loads [`AppConfig`] from an optional TOML file plus environment overrides.
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Read the file (if any), apply process environment overrides and validate.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Same as [`load`](Self::load) but with an injectable variable lookup so
    /// tests never touch the process environment.
    pub fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let path = self
            .path
            .clone()
            .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => load_file(&path)?,
            None => {
                debug!("no config file given, using defaults and environment");
                AppConfig::default()
            }
        };

        apply_env(&mut config, &lookup)?;
        validate(&config)?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<AppConfig> {
    debug!(path = %path.display(), "loading config file");
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

fn apply_env(config: &mut AppConfig, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = var("EVOLUTION_API_URL") {
        config.evolution.api_url = url;
    }
    if let Some(key) = var("EVOLUTION_API_KEY") {
        config.evolution.api_key = key;
    }
    if let Some(instance) = var("EVOLUTION_INSTANCE") {
        config.evolution.instance = instance;
    }
    config.evolution.api_url = config.evolution.api_url.trim_end_matches('/').to_string();

    if let Some(key) = var("OPENAI_API_KEY") {
        config.openai.api_key = key;
    }
    if let Some(voice) = var("OPENAI_VOICE") {
        config.openai.voice = voice;
    }
    if let Some(model) = var("OPENAI_MODEL") {
        config.openai.model = model;
    }
    if let Some(base_url) = var("OPENAI_BASE_URL") {
        config.openai.base_url = base_url;
    }
    config.openai.base_url = config.openai.base_url.trim_end_matches('/').to_string();

    if let Some(addr) = var("REDIS_ADDR") {
        config.redis.addr = addr;
    }
    if let Some(password) = var("REDIS_PASSWORD") {
        config.redis.password = Some(password);
    }
    if let Some(db) = var("REDIS_DB") {
        config.redis.db = db
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid REDIS_DB: {e}")))?;
    }

    if let Some(bind) = var("EVORELAY_BIND") {
        config.server.bind = bind;
    }
    if let Some(prompt) = var("EVORELAY_SYSTEM_PROMPT") {
        config.relay.system_prompt = prompt;
    }
    if let Some(flag) = var("EVORELAY_AUDIO_REPLIES") {
        config.relay.audio_replies = parse_bool(&flag)
            .ok_or_else(|| Error::Config(format!("invalid EVORELAY_AUDIO_REPLIES: {flag}")))?;
    }

    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    let mut missing = Vec::new();
    if config.evolution.api_url.is_empty() {
        missing.push("EVOLUTION_API_URL");
    }
    if config.evolution.api_key.is_empty() {
        missing.push("EVOLUTION_API_KEY");
    }
    if config.evolution.instance.is_empty() {
        missing.push("EVOLUTION_INSTANCE");
    }
    if config.openai.api_key.is_empty() {
        missing.push("OPENAI_API_KEY");
    }
    if !missing.is_empty() {
        return Err(Error::Config(format!(
            "missing required settings: {}",
            missing.join(", ")
        )));
    }

    if config.relay.store == StoreBackend::Redis && config.redis.addr.trim().is_empty() {
        return Err(Error::Config(
            "missing redis configuration: REDIS_ADDR".to_string(),
        ));
    }
    if config.evolution.timeout_secs == 0 {
        return Err(Error::Config(
            "evolution.timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.relay.history_limit == 0 {
        return Err(Error::Config("relay.history_limit must be at least 1".to_string()));
    }

    Ok(())
}
