//! `vera status` — Show the resolved runtime wiring.

use vera_config::AppConfig;

fn configured(value: bool) -> &'static str {
    if value { "configured" } else { "not configured" }
}

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Vera Status");
    println!("===========");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Agent:        {}", config.agent_name);
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!(
        "  Sampling:     temperature={} top_p={} max_tokens={}",
        config.temperature, config.top_p, config.max_output_tokens
    );
    println!("  API key:      {}", configured(config.has_api_key()));
    match config.memory.backend.as_str() {
        "file" => println!("  Memory:       file ({})", config.memory_path().display()),
        other => println!("  Memory:       {other}"),
    }
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Discord:      {}", configured(config.discord.webhook_url.is_some()));
    println!("  Mirror:       {}", config.fetch.mirror_base_url);
    println!(
        "  Knowledge:    {}",
        config.knowledge.library_url.as_deref().unwrap_or("generation only")
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; defaults and environment in use (see `vera config defaults`)");
    }

    Ok(())
}
