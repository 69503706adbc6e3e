mod rule;
mod rule_key;
mod rule_table;

pub use rule::Rule;
pub use rule_key::{RefSelector, RuleKey};
pub use rule_table::{MatchDecision, RuleTable, PING_EVENT};
