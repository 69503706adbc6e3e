use super::{GithubCommit, GithubRepository, GithubUser};

/// Fields shared by every event that concerns a repository. Missing or
/// malformed fields decode to their zero values.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GithubHookPayload {
    #[serde(rename = "ref")]
    pub reference: String,
    pub repository: GithubRepository,
}

impl GithubHookPayload {
    /// Best-effort decode: anything that is not a JSON object of the
    /// expected shape yields the empty envelope.
    pub fn decode(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!("Could not decode webhook payload: {e}");
            Self::default()
        })
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GithubPushWebhookPayload {
    pub commits: Vec<GithubCommit>,
    pub pusher: GithubUser,
}

impl GithubPushWebhookPayload {
    pub fn decode(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!("Could not decode push payload: {e}");
            Self::default()
        })
    }
}
