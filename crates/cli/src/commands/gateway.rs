//! `vera gateway` — Start the HTTP gateway.

use vera_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    super::ask::ensure_api_key(&config)?;

    println!("Vera Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    println!(
        "   Discord:   {}",
        if config.discord.webhook_url.is_some() { "webhook configured" } else { "not configured" }
    );
    println!(
        "   Signature: {}",
        if config.gateway.webhook_secret.is_some() { "required" } else { "not required" }
    );

    vera_gateway::start(config).await?;

    Ok(())
}
