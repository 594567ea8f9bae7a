//! Requested fields and the values extracted for them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The closed set of value shapes a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    StringArray,
}

/// A caller-supplied field to enrich. Immutable for the lifetime of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentField {
    /// Machine name, used as the key in the result map
    pub name: String,

    /// Human-readable label
    pub display_name: String,

    /// What the caller wants in this field
    #[serde(default)]
    pub description: String,

    /// Expected value shape
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,
}

impl EnrichmentField {
    /// Create a field with a display name derived from `name`.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let display_name = title_case(&split_identifier(&name));
        Self {
            name,
            display_name,
            description: String::new(),
            field_type,
            required: false,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Lower-cased `name description` text used by keyword rules.
    ///
    /// Identifiers are split, so `companyName` and `company_name` both read
    /// as `company name`.
    pub fn search_text(&self) -> String {
        format!(
            "{} {}",
            split_identifier(&self.name),
            self.description.to_lowercase()
        )
        .trim()
        .to_string()
    }
}

/// A value extracted for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    String(String),
    StringArray(Vec<String>),
}

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d[\d,]*(?:\.\d+)?|-?\.\d+)\s*(k|m|b|bn|thousand|million|billion)?\b")
        .unwrap()
});

impl FieldValue {
    /// Coerce a raw JSON value into the shape declared by `field_type`.
    ///
    /// Returns `None` for nulls, empty strings, and values that cannot be
    /// read as the target type.
    pub fn coerce(raw: &serde_json::Value, field_type: FieldType) -> Option<Self> {
        use serde_json::Value;

        match (field_type, raw) {
            (_, Value::Null) => None,
            (FieldType::String, Value::String(s)) => {
                let s = s.trim();
                (!s.is_empty() && !is_null_word(s)).then(|| Self::String(s.to_string()))
            }
            (FieldType::String, Value::Number(n)) => Some(Self::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Self::String(b.to_string())),
            (FieldType::String, Value::Array(items)) => {
                let joined = string_items(items).join(", ");
                (!joined.is_empty()).then_some(Self::String(joined))
            }
            (FieldType::Number, Value::Number(n)) => n.as_f64().map(Self::Number),
            (FieldType::Number, Value::String(s)) => parse_number(s).map(Self::Number),
            (FieldType::Boolean, Value::Bool(b)) => Some(Self::Boolean(*b)),
            (FieldType::Boolean, Value::String(s)) => parse_bool(s).map(Self::Boolean),
            (FieldType::StringArray, Value::Array(items)) => {
                let items = string_items(items);
                (!items.is_empty()).then_some(Self::StringArray(items))
            }
            (FieldType::StringArray, Value::String(s)) => {
                let items: Vec<String> = s
                    .split([',', ';'])
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty() && !is_null_word(part))
                    .collect();
                (!items.is_empty()).then_some(Self::StringArray(items))
            }
            _ => None,
        }
    }

    /// Human-readable rendering, also used for snippet matching.
    pub fn display(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::StringArray(items) => items.join(", "),
        }
    }

    /// Key used to decide whether two evidence values agree.
    ///
    /// Arrays compare as sets: items are trimmed, lower-cased, sorted and
    /// deduplicated before joining.
    pub fn agreement_key(&self) -> String {
        match self {
            Self::StringArray(items) => {
                let mut normalized: Vec<String> =
                    items.iter().map(|i| i.trim().to_lowercase()).collect();
                normalized.sort();
                normalized.dedup();
                normalized.join("\u{1f}")
            }
            Self::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
            other => other.display(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            Self::StringArray(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

fn string_items(items: &[serde_json::Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty() && !is_null_word(s))
        .collect()
}

fn is_null_word(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "null" | "none" | "n/a" | "na" | "unknown" | "not found" | "not available"
    )
}

/// Parse the first number in `s`, honoring thousands separators and
/// k/m/b magnitude suffixes ("1,200", "$5.2M", "3 million").
pub fn parse_number(s: &str) -> Option<f64> {
    let caps = NUMBER_RE.captures(s)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    let base: f64 = digits.parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()).as_deref() {
        Some("k") | Some("thousand") => 1_000.0,
        Some("m") | Some("million") => 1_000_000.0,
        Some("b") | Some("bn") | Some("billion") => 1_000_000_000.0,
        _ => 1.0,
    };
    Some(base * multiplier)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Render a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.2}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Split an identifier into lower-cased words.
///
/// `companyName` -> `company name`, `employee_count` -> `employee count`.
pub fn split_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.extend(ch.to_lowercase());
    }
    out.trim().to_string()
}

/// Upper-case the first letter of each whitespace-separated word.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
