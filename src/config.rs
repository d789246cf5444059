use crate::document::ISOLATED_TIME_KEY;
use crate::isolation::{Isolator, StampPolicy};
use crate::pf::{PfctlController, RuleTransport, DEFAULT_PFCTL};
use crate::{Error, Result};
use bon::Builder;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

/// Agent configuration installed by the macOS Wazuh/OSSEC package
pub const DEFAULT_DOCUMENT_PATH: &str = "/Library/Ossec/etc/ossec.conf";

/// Runtime settings for one invocation
#[derive(Debug, Clone, Builder)]
pub struct Settings {
    #[builder(default = PathBuf::from(DEFAULT_DOCUMENT_PATH), into)]
    pub document_path: PathBuf,
    #[builder(default = PathBuf::from(DEFAULT_PFCTL), into)]
    pub pfctl: PathBuf,
    #[builder(default)]
    pub pfctl_wrapper: Vec<String>,
    /// Write rules here and pass the path to pfctl instead of piping them
    pub rules_file: Option<PathBuf>,
    #[builder(default)]
    pub stamp_policy: StampPolicy,
    #[builder(default = true)]
    pub verify: bool,
    #[builder(default = ISOLATED_TIME_KEY.to_string(), into)]
    pub audit_key: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.document_path.as_os_str().is_empty() {
            return Err(Error::config_with_suggestion(
                "configuration document path is empty",
                "document_path",
                format!("pass --config or leave it unset to use {}", DEFAULT_DOCUMENT_PATH),
            ));
        }

        if self.pfctl.as_os_str().is_empty() {
            return Err(Error::config_at("pfctl path is empty", "pfctl"));
        }

        if self.pfctl_wrapper.iter().any(|arg| arg.is_empty()) {
            return Err(Error::config_at(
                "pfctl wrapper arguments must not be empty",
                "pfctl_wrapper",
            ));
        }

        if let Some(rules_file) = &self.rules_file {
            if rules_file.as_os_str().is_empty() || rules_file.file_name().is_none() {
                return Err(Error::config_with_suggestion(
                    format!("rules file '{}' is not a file path", rules_file.display()),
                    "rules_file",
                    "pass a file path such as /tmp/pf.rules",
                ));
            }
        }

        let key = self.audit_key.as_str();
        if key.is_empty() || key.contains(|c: char| c == '"' || c == '<' || c == '>' || c == '&') {
            return Err(Error::config_at(
                format!("audit key '{}' cannot be used as a label attribute", key),
                "audit_key",
            ));
        }

        Ok(())
    }

    pub fn controller(&self) -> PfctlController {
        let transport = match &self.rules_file {
            Some(path) => RuleTransport::File(path.clone()),
            None => RuleTransport::Stdin,
        };

        PfctlController::builder()
            .program(self.pfctl.as_os_str())
            .wrapper(self.pfctl_wrapper.iter().map(OsString::from).collect())
            .transport(transport)
            .build()
    }

    /// Validate and assemble the pfctl-backed pipeline
    pub fn isolator(&self) -> Result<Isolator<PfctlController>> {
        self.validate()?;
        debug!("Using settings {:?}", self);

        Ok(Isolator::builder()
            .document_path(self.document_path.clone())
            .filter(self.controller())
            .stamp_policy(self.stamp_policy)
            .verify(self.verify)
            .audit_key(self.audit_key.clone())
            .build())
    }
}
