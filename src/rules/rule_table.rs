use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use super::{RefSelector, Rule, RuleKey};
use crate::error::HarpoonError;

/// Event GitHub sends when a hook is created or redelivered as a test.
pub const PING_EVENT: &str = "ping";

#[derive(Debug, PartialEq, Eq)]
pub enum MatchDecision<'a> {
    /// Reachability check: accept, never dispatch.
    Ping,
    Matched(&'a Rule),
    Discarded,
}

/// Immutable lookup from `(event, repository, ref)` to the rule to run.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<RuleKey, Rule>,
}

impl RuleTable {
    /// Builds the table from configuration keys such as
    /// `push:acme/widgets:refs/heads/main`.
    pub fn from_config<'a>(
        events: impl IntoIterator<Item = (&'a String, &'a Rule)>,
    ) -> Result<Self, HarpoonError> {
        let rules = events
            .into_iter()
            .map(|(key, rule)| key.parse::<RuleKey>().map(|key| (key, rule.clone())))
            .collect::<Result<HashMap<_, _>, HarpoonError>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Exact ref first, then the repository's `all` rule.
    pub fn resolve(&self, event: &str, repository: &str, reference: &str) -> Option<&Rule> {
        if event == PING_EVENT {
            return None;
        }

        let exact = RuleKey::new(event, repository, RefSelector::Exact(reference.to_string()));
        self.rules.get(&exact).or_else(|| {
            let fallback = RuleKey::new(event, repository, RefSelector::All);
            self.rules.get(&fallback)
        })
    }

    pub fn should_handle(&self, event: &str, repository: &str, reference: &str) -> bool {
        event == PING_EVENT || self.resolve(event, repository, reference).is_some()
    }

    pub fn decide(&self, event: &str, repository: &str, reference: &str) -> MatchDecision<'_> {
        if event == PING_EVENT {
            return MatchDecision::Ping;
        }

        match self.resolve(event, repository, reference) {
            Some(rule) => MatchDecision::Matched(rule),
            None => MatchDecision::Discarded,
        }
    }
}

/// Deserializes the `events` table of the configuration file.
impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let events = HashMap::<String, Rule>::deserialize(deserializer)?;
        Self::from_config(&events).map_err(serde::de::Error::custom)
    }
}

impl FromIterator<(RuleKey, Rule)> for RuleTable {
    fn from_iter<T: IntoIterator<Item = (RuleKey, Rule)>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
