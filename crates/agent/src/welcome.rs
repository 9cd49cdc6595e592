//! Introductory text and sample prompts shown to new users.

use serde::Serialize;

/// A sample prompt a user could send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePrompt {
    pub data: &'static str,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Welcome {
    pub welcome: &'static str,
    pub prompts: Vec<SamplePrompt>,
}

pub fn welcome() -> Welcome {
    let prompt = |data| SamplePrompt {
        data,
        content_type: "text/plain",
    };

    Welcome {
        welcome: "I summarize links, pull posts from X through a mirror, spin those into thread starters, \
                  and remember who is talking so I can respect the server context.",
        prompts: vec![
            prompt("Can you summarize the links we dropped earlier today and suggest a thread title?"),
            prompt("Grab this tweet and make a Discord thread from it: https://x.com/someone/status/123"),
            prompt("Who asked about onboarding resources last time?"),
        ],
    }
}
