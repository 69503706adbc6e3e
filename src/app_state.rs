use crate::command::CommandDispatcher;
use crate::rules::RuleTable;
use crate::signature::WebhookSecret;

/// Everything a request needs. Built once at startup and only read after.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub rules: RuleTable,
    pub secret: WebhookSecret,
    pub dispatcher: CommandDispatcher,
    pub verbose: bool,
}

impl AppState {
    pub fn new(rules: RuleTable, secret: WebhookSecret, verbose: bool) -> Self {
        Self {
            rules,
            secret,
            dispatcher: CommandDispatcher::new(verbose),
            verbose,
        }
    }
}
