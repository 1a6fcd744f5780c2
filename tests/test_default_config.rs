//! The shipped config must load and carry the documented defaults.

use std::path::Path;
use std::time::Duration;

use relay_bot::config::load_from;

#[test]
fn default_config_loads() {
    let config = load_from(Path::new("config/default.toml"), None).expect("config/default.toml should load");

    assert_eq!(config.bot_name, "relay-bot");
    assert_eq!(config.log_level, "info");
    assert!(config.comms_discord_should_load());
    assert_eq!(config.llm.provider, "openai");
    assert_eq!(config.llm.openai.api_base_url, "https://api.openai.com/v1");
    assert!(config.llm_api_key.is_none(), "api key never comes from TOML");
}

#[test]
fn default_relay_settings() {
    let relay = load_from(Path::new("config/default.toml"), None).unwrap().relay;

    assert_eq!(relay.history_char_budget, 6000);
    assert_eq!(relay.chunk_max_len, 1900);
    assert_eq!(relay.chunk_delay, Duration::from_millis(500));
    assert_eq!(relay.clear_command, "!clear-gpt");
    assert_eq!(relay.access.channel_name_contains.as_deref(), Some("gpt"));
    assert!(relay.access.allowed_guilds.is_empty());
    assert_eq!(relay.models.text, "gpt-4");
    assert_eq!(relay.models.vision, "gpt-4-vision-preview");
    assert_eq!(relay.models.image, "dall-e-3");
    assert_eq!(relay.models.max_tokens, 500);
    assert_eq!(relay.models.classifier_max_tokens, 30);
    assert_eq!(relay.image.size, "1024x1024");
    assert_eq!(relay.image.count, 1);
}

#[test]
fn log_level_override_wins() {
    let config = load_from(Path::new("config/default.toml"), Some("debug")).unwrap();
    assert_eq!(config.log_level, "debug");
}
