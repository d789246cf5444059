pub mod error;

pub use error::{IsolationError, Step};

use crate::document::{AuditRecord, ConfigDocument, Endpoint, ISOLATED_TIME_KEY};
use crate::pf::{self, FilterState, PacketFilter, RuleSet, RuleSummary};
use bon::Builder;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, IsolationError>;

/// Order of audit stamping relative to loading the firewall rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StampPolicy {
    /// Every applied isolation is logged, even if pfctl fails afterwards
    #[default]
    BeforeApply,
    /// The firewall is isolated first; a stamp failure still fails the run
    AfterApply,
}

/// Progress of one isolation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Start,
    Extracted,
    RulesBuilt,
    Stamped,
    Applied,
    Verified,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of the advisory rule listing after a load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Verification {
    Skipped,
    Confirmed { summary: RuleSummary },
    Mismatch { summary: RuleSummary },
    Unavailable { reason: String },
}

impl Verification {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verification::Confirmed { .. })
    }
}

/// Endpoint and rules an isolation would apply
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub endpoint: Endpoint,
    pub rules: RuleSet,
    pub rules_text: String,
}

impl Plan {
    fn new(endpoint: Endpoint) -> Self {
        let rules = pf::build(&endpoint);
        let rules_text = rules.render();
        Self {
            endpoint,
            rules,
            rules_text,
        }
    }
}

/// Result of a completed isolation run
#[derive(Debug, Clone, Serialize)]
pub struct IsolationReport {
    pub document: PathBuf,
    pub plan: Plan,
    pub record: AuditRecord,
    pub stamp_policy: StampPolicy,
    pub verification: Verification,
    /// Final stage of the run. A returned report is always `Done`; failed runs
    /// surface as an [`IsolationError`] naming the step instead.
    pub stage: Stage,
}

#[derive(Builder)]
/// Runs the isolation pipeline: extract, build rules, stamp, apply, verify
pub struct Isolator<F: PacketFilter> {
    #[builder(into)]
    document_path: PathBuf,
    filter: F,
    #[builder(default)]
    stamp_policy: StampPolicy,
    /// List active rules after loading them
    #[builder(default = true)]
    verify: bool,
    #[builder(default = ISOLATED_TIME_KEY.to_string(), into)]
    audit_key: String,
}

impl<F: PacketFilter> Isolator<F> {
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Extract the endpoint and build the rules without touching anything
    pub fn plan(&self) -> Result<Plan> {
        let document = self.load()?;
        let endpoint = document
            .endpoint()
            .map_err(|e| IsolationError::new(Step::Extract, e))?;
        Ok(Plan::new(endpoint))
    }

    /// Isolate the host, stamping the current local time
    pub fn isolate(&self) -> Result<IsolationReport> {
        self.isolate_with(AuditRecord::now().with_key(self.audit_key.as_str()))
    }

    pub fn isolate_with(&self, record: AuditRecord) -> Result<IsolationReport> {
        let mut stage = Stage::Start;

        let mut document = self.load()?;
        let endpoint = document
            .endpoint()
            .map_err(|e| IsolationError::new(Step::Extract, e))?;
        advance(&mut stage, Stage::Extracted);
        info!("Isolating host, manager endpoint is {}", endpoint);

        let plan = Plan::new(endpoint);
        advance(&mut stage, Stage::RulesBuilt);

        match self.stamp_policy {
            StampPolicy::BeforeApply => {
                self.stamp(&mut document, &record)?;
                advance(&mut stage, Stage::Stamped);
                self.apply(&plan.rules)?;
                advance(&mut stage, Stage::Applied);
            }
            StampPolicy::AfterApply => {
                self.apply(&plan.rules)?;
                advance(&mut stage, Stage::Applied);
                self.stamp(&mut document, &record)?;
                advance(&mut stage, Stage::Stamped);
            }
        }

        let verification = if self.verify {
            let verification = self.check(&plan.rules);
            advance(&mut stage, Stage::Verified);
            verification
        } else {
            Verification::Skipped
        };

        advance(&mut stage, Stage::Done);
        info!("Host isolated: only {} is reachable", plan.endpoint);

        Ok(IsolationReport {
            document: self.document_path.clone(),
            plan,
            record,
            stamp_policy: self.stamp_policy,
            verification,
            stage,
        })
    }

    /// Lift isolation by disabling the packet filter
    pub fn release(&self) -> Result<()> {
        self.filter
            .set_filtering(FilterState::Disabled)
            .map_err(|e| IsolationError::new(Step::Disable, e))?;
        info!("Isolation released");
        Ok(())
    }

    fn load(&self) -> Result<ConfigDocument> {
        ConfigDocument::load(&self.document_path).map_err(|e| IsolationError::new(Step::Extract, e))
    }

    fn stamp(&self, document: &mut ConfigDocument, record: &AuditRecord) -> Result<()> {
        document
            .stamp(record)
            .map_err(|e| IsolationError::new(Step::Stamp, e))
    }

    fn apply(&self, rules: &RuleSet) -> Result<()> {
        self.filter
            .set_filtering(FilterState::Enabled)
            .map_err(|e| IsolationError::new(Step::Enable, e))?;
        self.filter
            .load_rules(rules)
            .map_err(|e| IsolationError::new(Step::Load, e))
    }

    fn check(&self, rules: &RuleSet) -> Verification {
        match self.filter.verify() {
            Ok(summary) if summary.covers(rules) => {
                debug!("pf reports {} active rules", summary.len());
                Verification::Confirmed { summary }
            }
            Ok(summary) => {
                warn!("Active pf rules do not match the isolation rules");
                Verification::Mismatch { summary }
            }
            Err(e) => {
                warn!("Could not verify active pf rules: {}", e);
                Verification::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("Isolation stage {} -> {}", stage, next);
    *stage = next;
}
