use std::fmt;
use std::str::FromStr;

use crate::error::HarpoonError;

/// Ref half of a rule key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefSelector {
    Exact(String),
    /// Spelled `all` in configuration; matches every ref.
    All,
}

impl RefSelector {
    pub const WILDCARD: &'static str = "all";
}

impl From<&str> for RefSelector {
    fn from(value: &str) -> Self {
        if value == Self::WILDCARD {
            RefSelector::All
        } else {
            RefSelector::Exact(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub event: String,
    pub repository: String,
    pub reference: RefSelector,
}

impl RuleKey {
    pub fn new(event: &str, repository: &str, reference: RefSelector) -> Self {
        Self {
            event: event.to_string(),
            repository: repository.to_string(),
            reference,
        }
    }
}

/// Parses `<event>:<owner/repo>:<ref|all>`.
///
/// The event ends at the first colon and the ref starts after the last one;
/// git forbids `:` in ref names, so everything in between is the repository.
impl FromStr for RuleKey {
    type Err = HarpoonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HarpoonError::InvalidEventKey(s.to_string());

        let (event, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (repository, reference) = rest.rsplit_once(':').ok_or_else(invalid)?;

        if event.is_empty() || repository.is_empty() || reference.is_empty() {
            return Err(invalid());
        }

        Ok(RuleKey::new(event, repository, reference.into()))
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reference = match &self.reference {
            RefSelector::Exact(reference) => reference.as_str(),
            RefSelector::All => RefSelector::WILDCARD,
        };
        write!(f, "{}:{}:{}", self.event, self.repository, reference)
    }
}
