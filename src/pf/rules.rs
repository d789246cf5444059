//! Isolation rule set for pf.
//!
//! pf evaluates every rule and the last match decides, unless a rule carries
//! `quick`. No `quick` is ever emitted here, so `block all` goes first and the
//! two `pass` rules narrow it. A first-match-wins backend needs the reverse
//! order.

use crate::document::{AddressFamily, Endpoint};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleRole {
    DefaultDeny,
    AllowInbound,
    AllowOutbound,
    Redirect,
}

impl fmt::Display for RuleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleRole::DefaultDeny => "default-deny",
            RuleRole::AllowInbound => "allow-inbound",
            RuleRole::AllowOutbound => "allow-outbound",
            RuleRole::Redirect => "redirect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleStatement {
    BlockAll,
    /// TCP pass rule between `peer` and any host on `port`
    PassTcp {
        direction: Direction,
        family: AddressFamily,
        peer: String,
        port: u16,
    },
}

impl RuleStatement {
    pub fn role(&self) -> RuleRole {
        match self {
            RuleStatement::BlockAll => RuleRole::DefaultDeny,
            RuleStatement::PassTcp {
                direction: Direction::In,
                ..
            } => RuleRole::AllowInbound,
            RuleStatement::PassTcp {
                direction: Direction::Out,
                ..
            } => RuleRole::AllowOutbound,
        }
    }
}

impl fmt::Display for RuleStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatement::BlockAll => write!(f, "block all"),
            RuleStatement::PassTcp {
                direction: Direction::In,
                family,
                peer,
                port,
            } => write!(
                f,
                "pass in {} proto tcp from {} to any port {}",
                family, peer, port
            ),
            RuleStatement::PassTcp {
                direction: Direction::Out,
                family,
                peer,
                port,
            } => write!(
                f,
                "pass out {} proto tcp from any to {} port {}",
                family, peer, port
            ),
        }
    }
}

/// Ordered pf rules, rendered one statement per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    statements: Vec<RuleStatement>,
}

impl RuleSet {
    pub fn statements(&self) -> &[RuleStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Rule file text handed to `pfctl -f`
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

/// Rules that cut the host off from everything but `endpoint`
pub fn build(endpoint: &Endpoint) -> RuleSet {
    let family = endpoint.family();
    let peer = endpoint.address().to_string();
    let port = endpoint.port();

    RuleSet {
        statements: vec![
            RuleStatement::BlockAll,
            RuleStatement::PassTcp {
                direction: Direction::In,
                family,
                peer: peer.clone(),
                port,
            },
            RuleStatement::PassTcp {
                direction: Direction::Out,
                family,
                peer,
                port,
            },
        ],
    }
}
