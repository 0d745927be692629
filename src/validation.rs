use regex::Regex;

use crate::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("name is empty")]
    Empty,
    #[error("name too long (max 253 characters)")]
    TooLong,
    #[error("label '{0}' too long (max 63 characters)")]
    LabelTooLong(String),
    #[error("label '{0}' contains invalid characters (only a-z, 0-9, '-' and '_' allowed)")]
    InvalidCharacters(String),
    #[error("label '{0}' must not start or end with '-'")]
    LeadingOrTrailingHyphen(String),
    #[error("name contains an empty label")]
    EmptyLabel,
}

lazy_static::lazy_static! {
    /// Letters, digits, '-' and '_' (service labels such as `_dmarc`).
    static ref LABEL_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

pub fn is_canonical(name: &str) -> bool {
    name.ends_with('.')
}

/// Fails with [`Error::NonCanonicalName`] unless `name` is dot-terminated.
pub fn require_canonical(name: &str) -> Result<(), Error> {
    if is_canonical(name) {
        Ok(())
    } else {
        Err(Error::non_canonical(name))
    }
}

/// Label-aware suffix test on canonical names: `a.example.com.` and
/// `example.com.` are in `example.com.`, `badexample.com.` is not.
pub fn is_in_zone(name: &str, zone: &str) -> bool {
    if zone == "." {
        return is_canonical(name);
    }
    let name = name.to_ascii_lowercase();
    let zone = zone.to_ascii_lowercase();
    name == zone || name.ends_with(&format!(".{zone}"))
}

pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    // wildcard owner
    if label == "*" {
        return Ok(());
    }
    if label.len() > 63 {
        return Err(ValidationError::LabelTooLong(label.into()));
    }
    if !LABEL_RE.is_match(label) {
        return Err(ValidationError::InvalidCharacters(label.into()));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::LeadingOrTrailingHyphen(label.into()));
    }

    Ok(())
}

pub fn validate_fqdn_ascii(domain: &str) -> Result<(), ValidationError> {
    // trailing dot optional here, callers canonicalize separately
    let d = domain.strip_suffix('.').unwrap_or(domain);
    if d.is_empty() {
        return Err(ValidationError::Empty);
    }
    if d.len() > 253 {
        return Err(ValidationError::TooLong);
    }
    for label in d.split('.') {
        validate_label(label)?;
    }
    Ok(())
}
