use serde::{Deserialize, Serialize};

/// Command to run when a rule matches. `args` stays a single string until
/// dispatch so configuration files remain declarative.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rule {
    pub cmd: String,
    #[serde(default)]
    pub args: String,
}
