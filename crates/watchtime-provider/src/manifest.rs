//! Provider manifest parsing and validation.
//!
//! Parses the JSON config arrays published by provider repositories. Each
//! entry declares one provider: identity, version, capability kind, and the
//! URLs its source blob and future updates are fetched from. A config is
//! only usable if every entry validates; imports are all-or-nothing.

use serde::{Deserialize, Serialize};

use watchtime_search::{Accuracy, ProviderKind};

use crate::error::ProviderError;

/// Hostnames a manifest URL may never point at.
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "[::1]",
    "169.254.169.254",
    "metadata.google.internal",
];

/// One provider entry from a published config manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub accuracy: Accuracy,
    pub icon: String,
    /// Hostnames the provider's sandbox may reach over HTTP. Empty means no
    /// network access at all.
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(rename = "update")]
    pub update_url: String,
    #[serde(rename = "code")]
    pub source_url: String,
}

// ─── Validation helpers ─────────────────────────────────────────────

/// Validate a provider id against `^[a-z0-9][a-z0-9._-]{0,127}$`.
///
/// Ids name database rows, blob files, and log fields, so the alphabet is
/// restricted to lowercase ASCII letters, digits, dots, underscores, and
/// hyphens, with a letter-or-digit first character.
fn validate_provider_id(id: &str) -> Result<(), ProviderError> {
    let len = id.len();
    if !(1..=128).contains(&len) {
        return Err(ProviderError::InvalidManifest(format!(
            "provider id must be 1-128 characters, got {len}"
        )));
    }

    let mut chars = id.chars();

    // First character must be a lowercase ASCII letter or digit
    if let Some(first) = chars.next() {
        if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
            return Err(ProviderError::InvalidManifest(format!(
                "provider id must start with a lowercase letter or digit, got '{first}'"
            )));
        }
    }

    for ch in chars {
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && !matches!(ch, '.' | '_' | '-') {
            return Err(ProviderError::InvalidManifest(format!(
                "provider id contains invalid character '{ch}'"
            )));
        }
    }

    Ok(())
}

/// Validate a version string as semver.
fn validate_semver(value: &str, field_name: &str) -> Result<(), ProviderError> {
    semver::Version::parse(value).map_err(|_| {
        ProviderError::InvalidManifest(format!("{field_name} is not valid semver: '{value}'"))
    })?;
    Ok(())
}

/// Validate an allowed-host entry granted to the provider's sandbox.
///
/// Must be non-empty, contain no spaces, never name a blocked private host,
/// and either be a wildcard pattern or contain at least one dot.
fn validate_allowed_host(host: &str) -> Result<(), ProviderError> {
    if host.is_empty() {
        return Err(ProviderError::InvalidManifest(
            "hosts entry must not be empty".into(),
        ));
    }
    if host.contains(' ') {
        return Err(ProviderError::InvalidManifest(format!(
            "hosts entry must not contain spaces: '{host}'"
        )));
    }
    if BLOCKED_HOSTS.contains(&host) {
        return Err(ProviderError::InvalidManifest(format!(
            "hosts entry '{host}' is blocked (private/reserved address)"
        )));
    }
    if !host.contains('*') && !host.contains('.') {
        return Err(ProviderError::InvalidManifest(format!(
            "hosts entry is not a valid domain: '{host}'"
        )));
    }
    Ok(())
}

/// Validate a manifest URL: https scheme, and never a private or reserved
/// host. Update and source URLs are fetched by the host on behalf of
/// untrusted configs, so they get the same address screening as plugin HTTP.
pub(crate) fn validate_https_url(value: &str, field_name: &str) -> Result<(), ProviderError> {
    let url = url::Url::parse(value).map_err(|_| {
        ProviderError::InvalidManifest(format!("{field_name} is not a valid URL: '{value}'"))
    })?;

    if url.scheme() != "https" {
        return Err(ProviderError::InvalidManifest(format!(
            "{field_name} must use https: '{value}'"
        )));
    }

    let host = match url.host_str() {
        Some(h) => h,
        None => {
            return Err(ProviderError::InvalidManifest(format!(
                "{field_name} has no host: '{value}'"
            )))
        }
    };

    if BLOCKED_HOSTS.contains(&host) {
        return Err(ProviderError::InvalidManifest(format!(
            "{field_name} points at a blocked private/reserved address: '{host}'"
        )));
    }

    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        let is_private = match ip {
            std::net::IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            std::net::IpAddr::V6(v6) => v6.is_loopback(),
        };
        if is_private {
            return Err(ProviderError::InvalidManifest(format!(
                "{field_name} points at a private IP: '{host}'"
            )));
        }
    }

    Ok(())
}

/// Column value for a provider kind.
pub(crate) fn kind_column(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Torrent => "torrent",
        ProviderKind::Nzb => "nzb",
    }
}

/// Column value for an accuracy tier.
pub(crate) fn accuracy_column(accuracy: Accuracy) -> &'static str {
    match accuracy {
        Accuracy::High => "high",
        Accuracy::Medium => "medium",
        Accuracy::Low => "low",
    }
}

impl ProviderManifest {
    /// Parse a config body into manifest entries. The body must be a JSON
    /// array; each element must carry all eight required fields.
    pub fn parse_list(json: &str) -> Result<Vec<Self>, ProviderError> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
            ProviderError::Manifest(format!("provider config is not a JSON array: {e}"))
        })?;

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value::<Self>(entry)
                    .map_err(|e| ProviderError::InvalidManifest(format!("entry {index}: {e}")))
            })
            .collect()
    }

    /// Validate all fields of a parsed entry.
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_provider_id(&self.id)?;

        let name_len = self.name.len();
        if name_len == 0 || name_len > 255 {
            return Err(ProviderError::InvalidManifest(format!(
                "name must be 1-255 characters, got {name_len}"
            )));
        }

        validate_semver(&self.version, "version")?;

        let icon_len = self.icon.len();
        if icon_len == 0 || icon_len > 500 {
            return Err(ProviderError::InvalidManifest(format!(
                "icon must be 1-500 characters, got {icon_len}"
            )));
        }

        for host in &self.hosts {
            validate_allowed_host(host)?;
        }

        validate_https_url(&self.update_url, "update")?;
        validate_https_url(&self.source_url, "code")?;

        Ok(())
    }

    /// Parse a config body and validate every entry. Any invalid entry, or a
    /// repeated id, fails the whole list.
    pub fn parse_and_validate_list(json: &str) -> Result<Vec<Self>, ProviderError> {
        let entries = Self::parse_list(json)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            entry.validate().map_err(|e| match e {
                ProviderError::InvalidManifest(message) => ProviderError::InvalidManifest(
                    format!("provider '{}': {message}", entry.id),
                ),
                other => other,
            })?;
            if !seen.insert(entry.id.as_str()) {
                return Err(ProviderError::InvalidManifest(format!(
                    "duplicate provider id: '{}'",
                    entry.id
                )));
            }
        }

        Ok(entries)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
