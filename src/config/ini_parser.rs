//! Minimal INI reader for partscan configuration files
//! Supports sections, key-value pairs, `#`/`;` comments, booleans, lists and sizes

use crate::error::AppError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct IniConfig {
    sections: HashMap<String, HashMap<String, String>>,
    global: HashMap<String, String>,
}

impl IniConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::invalid_configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse INI content from string
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let mut config = Self::new();
        let mut current_section = String::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            let line_number = index + 1;

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(inner) = line.strip_prefix('[') {
                // Unterminated headers are skipped rather than rejected
                let Some(name) = inner.strip_suffix(']') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(AppError::invalid_configuration(format!(
                        "Empty section name at line {line_number}"
                    )));
                }
                current_section = name.to_string();
                config.sections.entry(current_section.clone()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(AppError::invalid_configuration(format!(
                    "Invalid syntax at line {line_number}: {line}"
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(AppError::invalid_configuration(format!(
                    "Empty key at line {line_number}: {line}"
                )));
            }

            let value = strip_inline_comment(value).trim().to_string();

            let target = if current_section.is_empty() {
                &mut config.global
            } else {
                config.sections.entry(current_section.clone()).or_default()
            };
            target.insert(key.to_string(), value);
        }

        Ok(config)
    }

    /// Get string value; an empty section name addresses global keys
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        let map = if section.is_empty() {
            Some(&self.global)
        } else {
            self.sections.get(section)
        };
        map?.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// Get boolean value
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get_string(section, key)?.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        }
    }

    /// Get comma-separated list
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_string(section, key)
            .map(|s| split_list(&s))
            .unwrap_or_default()
    }

    /// Parse size (supports B, KB, MB, GB suffixes)
    pub fn get_size(&self, section: &str, key: &str) -> Option<u64> {
        parse_size(&self.get_string(section, key)?)
    }
}

/// Cuts a trailing ` # ...` or ` ; ...` comment. The marker must follow
/// whitespace so values like `multipart/form-data; boundary=x` survive.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    let cut = bytes.iter().enumerate().position(|(i, &b)| {
        matches!(b, b'#' | b';') && (i == 0 || bytes[i - 1].is_ascii_whitespace())
    });
    match cut {
        Some(i) => &value[..i],
        None => value,
    }
}

/// Splits a comma-separated value, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parses sizes like "64", "4KB", "1.5MB"
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim().to_uppercase();

    if let Ok(num) = value.parse::<u64>() {
        return Some(num);
    }

    let (num_part, multiplier) = [
        ("GB", 1024u64 * 1024 * 1024),
        ("MB", 1024 * 1024),
        ("KB", 1024),
        ("B", 1),
    ]
    .into_iter()
    .find_map(|(suffix, mult)| value.strip_suffix(suffix).map(|n| (n.trim(), mult)))?;

    if let Ok(num) = num_part.parse::<u64>() {
        return num.checked_mul(multiplier);
    }

    // Decimal values like "1.5"
    let num = num_part.parse::<f64>().ok()?;
    if num.is_sign_negative() || !num.is_finite() {
        return None;
    }
    Some((num * multiplier as f64) as u64)
}
