//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path in `RELAY_CONFIG`), then applies the `RELAY_LOG_LEVEL`
//! override. Secrets (`LLM_API_KEY`, `DISCORD_TOKEN`) only ever come from
//! the environment.

use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;
use crate::subsystems::relay::chunk;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Discord's per-message character cap. A full chunk plus the reply footer
/// has to fit.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Whether the Discord channel is explicitly enabled.
    pub enabled: bool,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub discord: DiscordConfig,
}

/// Who may talk to the bot.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Guild (server) ids whose channels are relayed.
    pub allowed_guilds: HashSet<u64>,
    /// Users whose direct messages are relayed.
    pub allowed_dm_users: HashSet<u64>,
    /// Guild channels must have this substring in their name. `None` = any channel.
    pub channel_name_contains: Option<String>,
}

/// Model names per capability.
#[derive(Debug, Clone)]
pub struct ModelsConfig {
    pub text: String,
    pub vision: String,
    pub image: String,
    /// Model used for the yes/no "is this an image request" check.
    pub classifier: String,
    pub max_tokens: u32,
    pub classifier_max_tokens: u32,
}

/// Options forwarded to the image-generation endpoint.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub size: String,
    pub quality: String,
    pub count: u32,
}

/// Relay pipeline configuration (`[relay]`).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub system_prompt: String,
    /// Max characters of content kept per conversation history.
    pub history_char_budget: usize,
    /// Max characters per outgoing chat message, footer excluded.
    pub chunk_max_len: usize,
    /// Pause between consecutive chunk sends.
    pub chunk_delay: Duration,
    /// Message text that clears the channel's history.
    pub clear_command: String,
    pub access: AccessConfig,
    pub models: ModelsConfig,
    pub image: ImageConfig,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root; `/chat/completions` and `/images/generations` are appended.
    pub api_base_url: String,
    /// Per-request HTTP timeout. `None` leaves reqwest's default (no timeout).
    pub timeout_seconds: Option<u64>,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub comms: CommsConfig,
    pub relay: RelayConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var; `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Returns `true` if the Discord channel should be loaded.
    pub fn comms_discord_should_load(&self) -> bool {
        self.comms.discord.enabled
    }
}

/// Raw TOML shape; `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    relay: RawRelay,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    log_level: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    discord: RawDiscord,
}

#[derive(Deserialize, Default)]
struct RawDiscord {
    /// Defaults to `false`: Discord must be explicitly enabled.
    #[serde(default)]
    enabled: bool,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawRelay {
    system_prompt: String,
    history_char_budget: usize,
    chunk_max_len: usize,
    chunk_delay_ms: u64,
    clear_command: String,
    allowed_guilds: Vec<u64>,
    allowed_dm_users: Vec<u64>,
    channel_name_contains: String,
    models: RawModels,
    image: RawImage,
}

impl Default for RawRelay {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful A.I. assistant.".to_string(),
            history_char_budget: 6000,
            chunk_max_len: 1900,
            chunk_delay_ms: 500,
            clear_command: "!clear-gpt".to_string(),
            allowed_guilds: Vec::new(),
            allowed_dm_users: Vec::new(),
            channel_name_contains: "gpt".to_string(),
            models: RawModels::default(),
            image: RawImage::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawModels {
    text: String,
    vision: String,
    image: String,
    classifier: String,
    max_tokens: u32,
    classifier_max_tokens: u32,
}

impl Default for RawModels {
    fn default() -> Self {
        Self {
            text: "gpt-4".to_string(),
            vision: "gpt-4-vision-preview".to_string(),
            image: "dall-e-3".to_string(),
            classifier: "gpt-4".to_string(),
            max_tokens: 500,
            classifier_max_tokens: 30,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawImage {
    size: String,
    quality: String,
    count: u32,
}

impl Default for RawImage {
    fn default() -> Self {
        Self {
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            count: 1,
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self { api_base_url: default_openai_api_base_url(), timeout_seconds: None }
    }
}

fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1".to_string() }

/// Load config from `RELAY_CONFIG` (or `config/default.toml`), then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("RELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let log_level_override = env::var("RELAY_LOG_LEVEL").ok();
    let mut config = load_from(&path, log_level_override.as_deref())?;
    config.llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
    Ok(config)
}

/// Internal loader; accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, log_level_override: Option<&str>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.supervisor;
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();
    logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    let r = parsed.relay;
    if r.chunk_max_len == 0 {
        return Err(AppError::Config("relay.chunk_max_len must be greater than zero".into()));
    }
    let footer_len = [&r.models.text, &r.models.vision]
        .into_iter()
        .map(|model| chunk::footer(model, &r.system_prompt).chars().count())
        .max()
        .unwrap_or(0);
    if r.chunk_max_len + footer_len > MAX_MESSAGE_CHARS {
        return Err(AppError::Config(format!(
            "relay.chunk_max_len ({}) plus the reply footer ({footer_len}) exceeds the \
             {MAX_MESSAGE_CHARS}-character message limit; shorten system_prompt or lower chunk_max_len",
            r.chunk_max_len
        )));
    }
    let channel_name_contains = Some(r.channel_name_contains.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(Config {
        bot_name: s.bot_name,
        log_level,
        comms: CommsConfig {
            discord: DiscordConfig { enabled: parsed.comms.discord.enabled },
        },
        relay: RelayConfig {
            system_prompt: r.system_prompt,
            history_char_budget: r.history_char_budget,
            chunk_max_len: r.chunk_max_len,
            chunk_delay: Duration::from_millis(r.chunk_delay_ms),
            clear_command: r.clear_command.trim().to_string(),
            access: AccessConfig {
                allowed_guilds: r.allowed_guilds.into_iter().collect(),
                allowed_dm_users: r.allowed_dm_users.into_iter().collect(),
                channel_name_contains,
            },
            models: ModelsConfig {
                text: r.models.text,
                vision: r.models.vision,
                image: r.models.image,
                classifier: r.models.classifier,
                max_tokens: r.models.max_tokens,
                classifier_max_tokens: r.models.classifier_max_tokens,
            },
            image: ImageConfig {
                size: r.image.size,
                quality: r.image.quality,
                count: r.image.count,
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url.trim_end_matches('/').to_string(),
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: None,
    })
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `RelayConfig` for unit tests; one allowed guild (`1`), one DM user
/// (`42`), `gpt` channels only, no chunk delay.
#[cfg(test)]
impl RelayConfig {
    pub fn test_default() -> Self {
        Self {
            system_prompt: "You are a test assistant.".into(),
            history_char_budget: 6000,
            chunk_max_len: 1900,
            chunk_delay: Duration::ZERO,
            clear_command: "!clear-gpt".into(),
            access: AccessConfig {
                allowed_guilds: HashSet::from([1]),
                allowed_dm_users: HashSet::from([42]),
                channel_name_contains: Some("gpt".into()),
            },
            models: ModelsConfig {
                text: "text-model".into(),
                vision: "vision-model".into(),
                image: "image-model".into(),
                classifier: "classifier-model".into(),
                max_tokens: 500,
                classifier_max_tokens: 30,
            },
            image: ImageConfig {
                size: "1024x1024".into(),
                quality: "standard".into(),
                count: 1,
            },
        }
    }
}
