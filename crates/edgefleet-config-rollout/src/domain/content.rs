//! Content addressing for configuration bodies.

use edgefleet_core::error::DomainError;
use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 of the YAML bytes.
#[must_use]
pub fn config_hash(yaml: &str) -> String {
    format!("{:x}", Sha256::digest(yaml.as_bytes()))
}

/// Checks that `yaml` is a non-blank, well-formed YAML document.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the body is blank or does not parse.
pub fn validate_yaml(yaml: &str) -> Result<(), DomainError> {
    if yaml.trim().is_empty() {
        return Err(DomainError::Validation(
            "yaml_config must not be empty".to_owned(),
        ));
    }
    serde_yaml::from_str::<serde_yaml::Value>(yaml)
        .map(|_| ())
        .map_err(|e| DomainError::Validation(format!("yaml_config is not valid YAML: {e}")))
}

/// Validates `yaml` and returns its hash, checking it against `claimed`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the YAML is invalid or the claimed
/// hash differs from the computed one.
pub fn address(yaml: &str, claimed: Option<&str>) -> Result<String, DomainError> {
    validate_yaml(yaml)?;
    let hash = config_hash(yaml);
    if let Some(claimed) = claimed
        && !claimed.eq_ignore_ascii_case(&hash)
    {
        return Err(DomainError::Validation(format!(
            "config_hash mismatch: expected {hash}, got {claimed}"
        )));
    }
    Ok(hash)
}
