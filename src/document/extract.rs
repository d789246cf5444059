use super::endpoint::Endpoint;
use super::error::{DocumentError, Result};
use super::CLOSING_MARKER;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ADDRESS_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<address>(.*?)</address>").expect("valid regex"));
static PORT_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<port>(.*?)</port>").expect("valid regex"));
static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Extract the manager endpoint from the configuration document text.
///
/// Only the part of the document before the closing root marker is scanned and
/// the first `<address>` and first `<port>` fields win, in document order.
pub fn extract(document: &str) -> Result<Endpoint> {
    let scanned = match document.find(CLOSING_MARKER) {
        Some(end) => &document[..end],
        None => document,
    };

    let address = first_field(&ADDRESS_FIELD, scanned, "address")?;
    let port = first_field(&PORT_FIELD, scanned, "port")?;
    debug!("Found manager address '{}' and port '{}'", address, port);

    Endpoint::parse(&address, &port)
}

fn first_field(pattern: &Regex, scanned: &str, field: &str) -> Result<String> {
    let value = pattern
        .captures(scanned)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| DocumentError::field_not_found(field))?;

    Ok(MARKUP.replace_all(value.as_str(), "").trim().to_string())
}
