pub mod config;
pub mod document;
pub mod error;
pub mod isolation;
pub mod pf;

pub use config::Settings;
pub use error::{Error, Result};
pub use isolation::{IsolationError, IsolationReport, Isolator, Plan, StampPolicy};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Warn when not running as root; pfctl and the agent config both need it
pub fn check_privileges() {
    #[cfg(unix)]
    if let Some(warning) = privilege_warning(nix::unistd::Uid::effective()) {
        tracing::warn!("{}", warning);
    }
}

#[cfg(unix)]
fn privilege_warning(euid: nix::unistd::Uid) -> Option<String> {
    if euid.is_root() {
        return None;
    }

    Some(format!(
        "Not running as root (euid {}); pfctl and writing the agent configuration will probably fail",
        euid
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::unistd::Uid;

    #[test]
    fn test_privilege_warning() {
        assert_eq!(privilege_warning(Uid::from_raw(0)), None);

        let warning = privilege_warning(Uid::from_raw(501)).unwrap();
        assert!(warning.contains("euid 501"));
    }
}
