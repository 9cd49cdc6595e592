//! `vera ask` — Run one message through the pipeline.

use vera_agent::Pipeline;
use vera_channels::DiscordWebhook;
use vera_config::AppConfig;
use vera_core::pipeline::PipelineRequest;

/// Options for a single pipeline pass.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub message: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub server_id: Option<String>,
    pub server_name: Option<String>,
    pub mentioned: bool,
    pub notify: bool,
    pub json: bool,
}

impl AskOptions {
    /// The request with unset identity fields left at their defaults.
    pub fn to_request(&self) -> PipelineRequest {
        let mut request = PipelineRequest::new(&self.message).mentioned(self.mentioned);
        if let Some(id) = &self.user_id {
            request.user_id = id.clone();
        }
        if let Some(name) = &self.user_name {
            request.user_name = name.clone();
        }
        if let Some(id) = &self.server_id {
            request.server_id = id.clone();
        }
        if let Some(name) = &self.server_name {
            request.server_name = name.clone();
        }
        request
    }
}

fn missing_key_message() -> String {
    format!(
        "No API key configured. Set VERA_API_KEY (or GOOGLE_API_KEY, OPENROUTER_API_KEY, \
         OPENAI_API_KEY), or add api_key to {}",
        AppConfig::config_dir().join("config.toml").display()
    )
}

/// Fail early with setup hints when the default provider has no key.
pub(crate) fn ensure_api_key(config: &AppConfig) -> Result<(), String> {
    if config.has_api_key() {
        Ok(())
    } else {
        Err(missing_key_message())
    }
}

pub async fn run(config: &AppConfig, options: AskOptions) -> Result<(), Box<dyn std::error::Error>> {
    ensure_api_key(config)?;

    let pipeline = Pipeline::from_config(config)?;
    let request = options.to_request();

    eprint!("  Thinking...");
    let result = pipeline.process(&request).await;
    eprint!("\r              \r");
    let response = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.render_text());
    }

    if options.notify {
        match DiscordWebhook::from_config(config) {
            Some(discord) => {
                discord.notify(&response, None, None).await;
                eprintln!("  Sent to Discord");
            }
            None => eprintln!("  [Skipped] DISCORD_WEBHOOK_URL is not set"),
        }
    }

    Ok(())
}
