mod controller;
pub mod error;
pub mod rules;
mod summary;

pub use controller::{PfctlController, RuleTransport, DEFAULT_PFCTL};
pub use error::{ControlError, Operation};
pub use rules::{build, Direction, RuleRole, RuleSet, RuleStatement};
pub use summary::{ActiveRule, RuleSummary};

use serde::Serialize;
use std::fmt;

/// Desired or observed state of the packet filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    Disabled,
    Enabled,
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterState::Disabled => write!(f, "disabled"),
            FilterState::Enabled => write!(f, "enabled"),
        }
    }
}

/// Operations the isolation pipeline needs from a packet filter.
///
/// Every call blocks until the firewall has answered. Callers must not run
/// two pipelines against the same firewall at once.
pub trait PacketFilter {
    fn set_filtering(&self, state: FilterState) -> error::Result<()>;

    /// Replace the active rule set with `rules`
    fn load_rules(&self, rules: &RuleSet) -> error::Result<()>;

    /// List active rules; advisory only
    fn verify(&self) -> error::Result<RuleSummary>;
}
