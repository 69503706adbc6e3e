use std::fmt;

use super::GithubUser;

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GithubCommit {
    pub message: String,
    pub timestamp: String,
    pub author: GithubUser,
}

/// One line of operator output: `<timestamp> - <message> by <author>`.
impl fmt::Display for GithubCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} by {}",
            self.timestamp, self.message, self.author.name
        )
    }
}
