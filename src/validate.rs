use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::config::Config;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL must start with http:// or https://")]
    MissingScheme,
    #[error("URL has no host")]
    MissingHost,
    #[error("unsupported site: {0}")]
    UnsupportedHost(String),
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://").expect("static regex"))
}

fn host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"://([^/]+)").expect("static regex"))
}

/// Checks the URL shape and host without touching the network.
pub fn check<S: AsRef<str>>(url: &str, domains: &[S]) -> Result<(), ValidationError> {
    if !scheme_re().is_match(url) {
        return Err(ValidationError::MissingScheme);
    }

    let host = host_re()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .ok_or(ValidationError::MissingHost)?;

    if domains.iter().any(|d| host.contains(d.as_ref())) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedHost(host))
    }
}

pub fn is_supported<S: AsRef<str>>(url: &str, domains: &[S]) -> bool {
    check(url, domains).is_ok()
}

/// A URL that passed validation. Only constructible through [`SourceRef::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn parse(input: &str, config: &Config) -> Result<Self, ValidationError> {
        let url = input.trim();
        check(url, &config.allowed_domains)?;
        Ok(Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
