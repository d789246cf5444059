use super::error::{ControlError, Operation, Result};
use super::rules::RuleSet;
use super::summary::RuleSummary;
use super::{FilterState, PacketFilter};
use bon::Builder;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_PFCTL: &str = "/sbin/pfctl";

/// How rule text reaches pfctl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleTransport {
    /// `pfctl -f -`
    #[default]
    Stdin,
    /// Rules are written to this file first, then `pfctl -f <path>`
    File(PathBuf),
}

#[derive(Debug, Clone, Builder)]
/// Drives pf through the `pfctl` command line tool
pub struct PfctlController {
    #[builder(default = OsString::from(DEFAULT_PFCTL), into)]
    program: OsString,
    /// Command the pfctl invocation is run through, e.g. `["sudo", "-n"]`
    #[builder(default)]
    wrapper: Vec<OsString>,
    #[builder(default)]
    transport: RuleTransport,
}

impl PfctlController {
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn transport(&self) -> &RuleTransport {
        &self.transport
    }

    fn command(&self) -> Command {
        match self.wrapper.split_first() {
            Some((wrapper, wrapper_args)) => {
                let mut cmd = Command::new(wrapper);
                cmd.args(wrapper_args).arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        }
    }

    fn launched_program(&self) -> &OsStr {
        self.wrapper.first().unwrap_or(&self.program)
    }

    /// Run pfctl with `args` and wait for it to exit
    fn run(&self, operation: Operation, args: &[&OsStr], input: Option<&str>) -> Result<Output> {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Running {:?} to {}", cmd, operation);

        let mut child = cmd
            .spawn()
            .map_err(|e| ControlError::launch(operation, self.launched_program(), e))?;

        if let Some(input) = input {
            if let Err(e) = feed_stdin(&mut child, input) {
                // pfctl may have bailed out before reading everything; its exit
                // status and stderr say more than the broken pipe does
                let output = child
                    .wait_with_output()
                    .map_err(|e| ControlError::transport(operation, e))?;
                check(operation, &output)?;
                return Err(ControlError::transport(operation, e));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ControlError::transport(operation, e))?;
        check(operation, &output)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("pfctl ({}) reported: {}", operation, stderr.trim());
        }
        Ok(output)
    }

    fn request_state(&self, operation: Operation, flag: &str, already: &[&str]) -> Result<()> {
        match self.run(operation, &[OsStr::new(flag)], None) {
            Ok(_) => Ok(()),
            Err(ControlError::Failed { stderr_excerpt, .. })
                if already.iter().any(|s| stderr_excerpt.contains(s)) =>
            {
                debug!("pf already in requested state: {}", stderr_excerpt);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl PacketFilter for PfctlController {
    fn set_filtering(&self, state: FilterState) -> Result<()> {
        match state {
            FilterState::Enabled => {
                self.request_state(Operation::Enable, "-e", &["already enabled"])?
            }
            FilterState::Disabled => self.request_state(
                Operation::Disable,
                "-d",
                &["not enabled", "already disabled"],
            )?,
        }
        info!("Packet filter {}", state);
        Ok(())
    }

    fn load_rules(&self, rules: &RuleSet) -> Result<()> {
        let text = rules.render();

        match &self.transport {
            RuleTransport::Stdin => {
                self.run(Operation::Load, &[OsStr::new("-f"), OsStr::new("-")], Some(&text))?;
            }
            RuleTransport::File(path) => {
                write_rules_file(path, &text)
                    .map_err(|e| ControlError::transport(Operation::Load, e))?;
                debug!("Wrote {} rules to {}", rules.len(), path.display());
                self.run(Operation::Load, &[OsStr::new("-f"), path.as_os_str()], None)?;
            }
        }

        info!("Loaded {} pf rules", rules.len());
        Ok(())
    }

    fn verify(&self) -> Result<RuleSummary> {
        let output = self.run(Operation::Verify, &[OsStr::new("-s"), OsStr::new("rules")], None)?;
        let summary = RuleSummary::parse(&String::from_utf8_lossy(&output.stdout));
        if summary.is_empty() {
            warn!("pfctl reports no active rules");
        }
        Ok(summary)
    }
}

fn feed_stdin(child: &mut Child, input: &str) -> std::io::Result<()> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("stdin of pfctl was not captured"))?;
    stdin.write_all(input.as_bytes())?;
    stdin.flush()
    // stdin is dropped here, closing the pipe
}

fn check(operation: Operation, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    Err(ControlError::failed(
        operation,
        output.status.code(),
        &String::from_utf8_lossy(&output.stderr),
    ))
}

fn write_rules_file(path: &Path, text: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
