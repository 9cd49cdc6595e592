//! Discussion-thread drafts built from social posts.

use vera_core::error::ProviderError;
use vera_core::fetch::ContentFetcher;
use vera_core::pipeline::TweetThread;

use crate::generate::Generator;
use crate::urls::to_mirror_url;

/// Thread text used when the post could not be fetched.
pub const THREAD_UNAVAILABLE: &str =
    "Could not retrieve the tweet via the mirror. Double-check the link.";

fn transcription_prompt(body: &str) -> String {
    format!(
        "Extract the tweet text (and any visible replies) from the following HTML or text captured from a mirror of the post. \
         Return a compact transcription with speaker names when available.\n{body}"
    )
}

fn thread_prompt(server_name: &str, user_name: &str, transcription: &str) -> String {
    format!(
        "Using this tweet content, craft a short Discord thread tailored for \"{server_name}\". \
         Write 3-6 numbered posts that keep the original voice but invite the community to respond. \
         Tag the user \"{user_name}\" naturally if it fits. Tweet content:\n{transcription}"
    )
}

/// Fetch a post through the mirror and draft a numbered thread from it.
///
/// The post is transcribed first, then the transcription is turned into the
/// thread. The returned `url` is always the original `tweet_url`.
pub async fn build_thread(
    generator: &Generator,
    fetcher: &dyn ContentFetcher,
    mirror_base: &str,
    tweet_url: &str,
    server_name: &str,
    user_name: &str,
) -> Result<TweetThread, ProviderError> {
    let lookup_url = to_mirror_url(tweet_url, mirror_base).unwrap_or_else(|| tweet_url.to_string());

    let Some(body) = fetcher.fetch(&lookup_url).await else {
        return Ok(TweetThread {
            url: tweet_url.to_string(),
            thread: THREAD_UNAVAILABLE.to_string(),
        });
    };

    let transcription = generator.generate(&transcription_prompt(&body)).await?;
    let thread = generator
        .generate(&thread_prompt(server_name, user_name, &transcription))
        .await?;

    Ok(TweetThread {
        url: tweet_url.to_string(),
        thread,
    })
}
