//! Field checks shared by the CLI arguments and `outreach.toml`.

use crate::utils::error::{OutreachError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> OutreachError {
    OutreachError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

/// A file argument must name a file with one of `extensions` (case-insensitive).
pub fn validate_file_arg(field_name: &str, path: &str, extensions: &[&str]) -> Result<()> {
    validate_non_empty_string(field_name, path)?;

    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if extensions.contains(&ext.as_str()) => Ok(()),
        _ => Err(invalid(
            field_name,
            path,
            format!("Expected a .{} file", extensions.join(" or .")),
        )),
    }
}

/// Collaborator base URLs are plain http(s).
pub fn validate_endpoint_url(field_name: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| invalid(field_name, raw, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field_name, raw, format!("Unsupported URL scheme: {}", scheme))),
    }
}

/// Returns the key once it is present and fully substituted.
pub fn validate_api_key<'a>(field_name: &str, key: Option<&'a str>) -> Result<&'a str> {
    let key = key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| OutreachError::MissingConfigError {
            field: field_name.to_string(),
        })?;
    // An unset environment variable leaves its placeholder behind.
    if key.contains("${") {
        return Err(OutreachError::MissingConfigError {
            field: format!("{} (environment variable {})", field_name, key),
        });
    }
    Ok(key)
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}
