//! `vera config` — Configuration inspection commands.

use vera_config::AppConfig;

const REDACTED: &str = "[REDACTED]";

/// A copy of `config` safe to print.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mask = |secret: &mut Option<String>| {
        if secret.is_some() {
            *secret = Some(REDACTED.to_string());
        }
    };

    let mut shown = config.clone();
    mask(&mut shown.api_key);
    mask(&mut shown.gateway.webhook_secret);
    mask(&mut shown.discord.webhook_url);
    for provider in shown.providers.values_mut() {
        mask(&mut provider.api_key);
    }
    shown
}

pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

pub fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
    Ok(())
}

pub fn validate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    println!("Config parsed and validated");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (VERA_API_KEY, GOOGLE_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY)");
    }
    if config.discord.webhook_url.is_none() {
        warnings.push("No Discord webhook URL; /webhook will only report the missing setting");
    }
    for w in &warnings {
        println!("   warning: {w}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vera_config::ProviderConfig;

    #[test]
    fn secrets_are_masked() {
        let mut config = AppConfig::default();
        config.api_key = Some("AIza-secret".into());
        config.discord.webhook_url = Some("https://discord.com/api/webhooks/1/token".into());
        config.providers.insert(
            "openrouter".into(),
            ProviderConfig {
                api_key: Some("sk-or".into()),
                api_url: None,
            },
        );

        let text = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!text.contains("AIza-secret"));
        assert!(!text.contains("webhooks/1/token"));
        assert!(!text.contains("sk-or"));
        assert!(text.contains(REDACTED));
    }

    #[test]
    fn unset_secrets_stay_unset() {
        let shown = redacted(&AppConfig::default());
        assert!(shown.api_key.is_none());
        assert!(shown.gateway.webhook_secret.is_none());
    }
}
