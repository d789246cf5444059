use super::rules::{RuleRole, RuleSet, RuleStatement};
use serde::Serialize;
use std::net::IpAddr;

/// One line of `pfctl -s rules` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveRule {
    pub text: String,
    pub role: Option<RuleRole>,
}

impl ActiveRule {
    fn parse(line: &str) -> Self {
        let words: Vec<&str> = line.split_whitespace().collect();
        let role = match words.as_slice() {
            ["block", rest @ ..] if rest.contains(&"all") => Some(RuleRole::DefaultDeny),
            ["pass", "in", ..] => Some(RuleRole::AllowInbound),
            ["pass", "out", ..] => Some(RuleRole::AllowOutbound),
            ["rdr", ..] | ["rdr-anchor", ..] => Some(RuleRole::Redirect),
            _ => None,
        };

        Self {
            text: line.to_string(),
            role,
        }
    }

    fn mentions(&self, word: &str) -> bool {
        self.text.split_whitespace().any(|w| w == word)
    }
}

/// Rules pf reports as active
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub rules: Vec<ActiveRule>,
}

impl RuleSummary {
    pub fn parse(output: &str) -> Self {
        let rules = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ActiveRule::parse)
            .collect();

        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn count(&self, role: RuleRole) -> usize {
        self.rules.iter().filter(|r| r.role == Some(role)).count()
    }

    /// Whether every statement of `expected` has an active counterpart.
    ///
    /// pf prints rules normalized (`block drop all`, `port = 1514`, `keep state`),
    /// so lines are matched by role, peer and port rather than verbatim.
    ///
    /// A hostname peer is resolved when pf loads the rules and only the
    /// address is listed back, so such peers are matched on port alone.
    pub fn covers(&self, expected: &RuleSet) -> bool {
        expected.statements().iter().all(|statement| {
            let role = statement.role();
            self.rules.iter().filter(|r| r.role == Some(role)).any(|r| match statement {
                RuleStatement::BlockAll => true,
                RuleStatement::PassTcp { peer, port, .. } => {
                    let peer_listed = peer.parse::<IpAddr>().is_err() || r.mentions(peer);
                    r.mentions("tcp") && peer_listed && r.mentions(&port.to_string())
                }
            })
        })
    }
}
