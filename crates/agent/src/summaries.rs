//! Link summaries for generic (non-social) URLs.

use vera_core::error::ProviderError;
use vera_core::fetch::ContentFetcher;

use crate::generate::Generator;

fn summary_prompt(server_name: &str, body: &str) -> String {
    format!(
        "Summarize the key points of the link for a Discord audience on \"{server_name}\". \
         Stay concise (3-5 bullet points) and surface any actions for the server. Content:\n{body}"
    )
}

/// One `- <url>: <summary>` line for `url`.
///
/// An unreachable link yields a retry hint instead of a summary and costs
/// no generation call.
pub async fn summarize_link(
    generator: &Generator,
    fetcher: &dyn ContentFetcher,
    url: &str,
    server_name: &str,
) -> Result<String, ProviderError> {
    let Some(body) = fetcher.fetch(url).await else {
        return Ok(format!("- {url}: (could not fetch content, please try again)"));
    };

    let summary = generator.generate(&summary_prompt(server_name, &body)).await?;
    Ok(format!("- {url}: {summary}"))
}
