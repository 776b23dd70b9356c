use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Você é um assistente do WhatsApp. Responda de forma breve e amigável.";
pub const DEFAULT_AUDIO_CAPTION: &str = "Resposta em áudio";

/// Top-level configuration for the relay process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub evolution: EvolutionConfig,
    pub openai: OpenAiConfig,
    pub redis: RedisConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Evolution API (WhatsApp gateway) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub api_url: String,
    pub api_key: String,
    pub instance: String,
    pub timeout_secs: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            instance: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub addr: String,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisConfig {
    /// Connection URL without credentials. The password travels separately
    /// so reserved characters in it never reach the URL parser.
    pub fn url(&self) -> String {
        let addr = self
            .addr
            .trim_start_matches("redis://")
            .trim_end_matches('/');
        format!("redis://{addr}/{}", self.db)
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Reply pipeline behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub system_prompt: String,
    pub audio_replies: bool,
    pub audio_caption: String,
    pub history_limit: usize,
    pub history_ttl_secs: u64,
    pub store: StoreBackend,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            audio_replies: true,
            audio_caption: DEFAULT_AUDIO_CAPTION.to_string(),
            history_limit: 20,
            history_ttl_secs: 24 * 60 * 60,
            store: StoreBackend::Redis,
        }
    }
}
