//! Pure per-step validation.
//!
//! Every field carries a [`Rule`] applied to present values, required fields
//! are checked for blankness, and cross-field [`StepCheck`]s run last. The
//! result is a fresh [`FieldErrors`] map on every call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::step::StepDefinition;
use super::store::{is_blank_value, FieldStore};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

static AHPRA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}[0-9]{10}$").expect("AHPRA pattern compiles"));

const ABN_WEIGHTS: [i64; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];
const HPIO_PREFIX: &str = "800362";

/// Field name → message, ordered for stable rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

type RuleCallback = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// Format checks applied to a present, non-blank value.
#[derive(Clone)]
pub enum Rule {
    Text,
    MaxLength(usize),
    Date,
    Email,
    Phone,
    /// Australian Business Number with modulus-89 checksum.
    Abn,
    /// Healthcare Provider Identifier for organisations (16 digits, Luhn).
    Hpio,
    /// AHPRA registration number, e.g. `MED0001234567`.
    AhpraNumber,
    PositiveInteger,
    Boolean,
    MustAccept,
    OneOf(Vec<&'static str>),
    Custom(Arc<RuleCallback>),
}

impl Rule {
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Rule::Custom(Arc::new(check))
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Rule::Text => expect_text(value).map(|_| ()),
            Rule::MaxLength(max) => {
                let text = expect_text(value)?;
                let count = text.trim().chars().count();
                if count > *max {
                    Err(format!("Cannot exceed {} characters (got {})", max, count))
                } else {
                    Ok(())
                }
            }
            Rule::Date => parse_date(value).map(|_| ()),
            Rule::Email => {
                let text = expect_text(value)?;
                if EMAIL_PATTERN.is_match(text.trim()) {
                    Ok(())
                } else {
                    Err("Enter a valid email address".into())
                }
            }
            Rule::Phone => {
                let text = expect_text(value)?;
                if is_phone_number(text) {
                    Ok(())
                } else {
                    Err("Enter a phone number with 8 to 15 digits".into())
                }
            }
            Rule::Abn => {
                let digits = digits_of(expect_text(value)?)
                    .ok_or_else(|| "ABN must contain digits only".to_string())?;
                if digits.len() != 11 {
                    return Err("ABN must have 11 digits".into());
                }
                if abn_checksum_ok(&digits) {
                    Ok(())
                } else {
                    Err("ABN checksum is invalid".into())
                }
            }
            Rule::Hpio => {
                let text = expect_text(value)?;
                let digits = digits_of(text)
                    .ok_or_else(|| "HPI-O must contain digits only".to_string())?;
                if digits.len() != 16 {
                    return Err("HPI-O must have 16 digits".into());
                }
                if !text.replace(' ', "").starts_with(HPIO_PREFIX) {
                    return Err(format!("HPI-O must start with {}", HPIO_PREFIX));
                }
                if luhn_ok(&digits) {
                    Ok(())
                } else {
                    Err("HPI-O check digit is invalid".into())
                }
            }
            Rule::AhpraNumber => {
                let text = expect_text(value)?;
                if AHPRA_PATTERN.is_match(text.trim()) {
                    Ok(())
                } else {
                    Err("Use three capital letters followed by 10 digits (e.g., MED0001234567)".into())
                }
            }
            Rule::PositiveInteger => match value {
                Value::Number(number) => match number.as_u64() {
                    Some(n) if n > 0 => Ok(()),
                    _ => Err("Enter a whole number (1 or greater)".into()),
                },
                Value::String(text) => match text.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err("Enter a whole number (1 or greater)".into()),
                },
                _ => Err("Enter a whole number (1 or greater)".into()),
            },
            Rule::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err("Choose yes or no".into())
                }
            }
            Rule::MustAccept => match value {
                Value::Bool(true) => Ok(()),
                _ => Err("Must be accepted to continue".into()),
            },
            Rule::OneOf(options) => {
                let text = expect_text(value)?;
                if options.iter().any(|option| *option == text.trim()) {
                    Ok(())
                } else {
                    Err(format!("Value must be one of: {}", options.join(", ")))
                }
            }
            Rule::Custom(callback) => callback(value),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Custom(_) => f.write_str("Custom(..)"),
            Rule::OneOf(options) => f.debug_tuple("OneOf").field(options).finish(),
            Rule::MaxLength(max) => f.debug_tuple("MaxLength").field(max).finish(),
            other => {
                let name = match other {
                    Rule::Text => "Text",
                    Rule::Date => "Date",
                    Rule::Email => "Email",
                    Rule::Phone => "Phone",
                    Rule::Abn => "Abn",
                    Rule::Hpio => "Hpio",
                    Rule::AhpraNumber => "AhpraNumber",
                    Rule::PositiveInteger => "PositiveInteger",
                    Rule::Boolean => "Boolean",
                    Rule::MustAccept => "MustAccept",
                    _ => "Rule",
                };
                f.write_str(name)
            }
        }
    }
}

type CheckCallback = dyn Fn(&Value) -> Option<(String, String)> + Send + Sync;

/// Cross-field checks evaluated against a step's section after field rules.
/// A check is skipped when any field it reads already has an error.
#[derive(Clone)]
pub enum StepCheck {
    /// `earlier` must be strictly before `later`; the error lands on `later`.
    DateOrder {
        earlier: &'static str,
        later: &'static str,
        message: &'static str,
    },
    /// `field` becomes required while the boolean `toggle` is on.
    RequiredWhen {
        field: &'static str,
        toggle: &'static str,
        message: &'static str,
    },
    /// Date `field` must be on or after `reference`.
    NotBefore {
        field: &'static str,
        reference: NaiveDate,
        message: &'static str,
    },
    Custom(Arc<CheckCallback>),
}

impl StepCheck {
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Option<(String, String)> + Send + Sync + 'static,
    {
        StepCheck::Custom(Arc::new(check))
    }

    fn evaluate(&self, section: &Value, errors: &FieldErrors) -> Option<(String, String)> {
        match self {
            StepCheck::DateOrder {
                earlier,
                later,
                message,
            } => {
                if errors.contains(earlier) || errors.contains(later) {
                    return None;
                }
                let start = section.get(*earlier).and_then(|v| parse_date(v).ok())?;
                let end = section.get(*later).and_then(|v| parse_date(v).ok())?;
                if start < end {
                    None
                } else {
                    Some((later.to_string(), message.to_string()))
                }
            }
            StepCheck::RequiredWhen {
                field,
                toggle,
                message,
            } => {
                if errors.contains(field) {
                    return None;
                }
                let enabled = section.get(*toggle).and_then(Value::as_bool) == Some(true);
                let blank = section.get(*field).map(is_blank_value).unwrap_or(true);
                if enabled && blank {
                    Some((field.to_string(), message.to_string()))
                } else {
                    None
                }
            }
            StepCheck::NotBefore {
                field,
                reference,
                message,
            } => {
                if errors.contains(field) {
                    return None;
                }
                let date = section.get(*field).and_then(|v| parse_date(v).ok())?;
                if date < *reference {
                    Some((field.to_string(), message.to_string()))
                } else {
                    None
                }
            }
            StepCheck::Custom(callback) => callback(section),
        }
    }
}

impl fmt::Debug for StepCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepCheck::DateOrder { earlier, later, .. } => f
                .debug_struct("DateOrder")
                .field("earlier", earlier)
                .field("later", later)
                .finish(),
            StepCheck::RequiredWhen { field, toggle, .. } => f
                .debug_struct("RequiredWhen")
                .field("field", field)
                .field("toggle", toggle)
                .finish(),
            StepCheck::NotBefore {
                field, reference, ..
            } => f
                .debug_struct("NotBefore")
                .field("field", field)
                .field("reference", reference)
                .finish(),
            StepCheck::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Validates one step against the store. Only the step's own section is read.
pub fn validate_step(step: &StepDefinition, store: &FieldStore) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let empty = Value::Object(Default::default());
    let section = store.section(step.section).unwrap_or(&empty);

    for field in &step.fields {
        match section.get(field.name) {
            Some(value) if !is_blank_value(value) => {
                if let Err(message) = field.rule.check(value) {
                    errors.insert(field.name, message);
                }
            }
            _ => {
                if field.required {
                    errors.insert(field.name, format!("{} is required", field.label));
                }
            }
        }
    }

    for check in &step.checks {
        if let Some((field, message)) = check.evaluate(section, &errors) {
            if !errors.contains(&field) {
                errors.insert(field, message);
            }
        }
    }

    errors
}

pub fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    let text = expect_text(value)?;
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| "Use YYYY-MM-DD format".to_string())
}

fn expect_text(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| "Enter a text value".to_string())
}

fn digits_of(text: &str) -> Option<Vec<u32>> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(10))
        .collect()
}

fn is_phone_number(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && (8..=15).contains(&digits.len())
}

fn abn_checksum_ok(digits: &[u32]) -> bool {
    let sum: i64 = digits
        .iter()
        .zip(ABN_WEIGHTS.iter())
        .enumerate()
        .map(|(index, (digit, weight))| {
            let digit = i64::from(*digit);
            let adjusted = if index == 0 { digit - 1 } else { digit };
            adjusted * weight
        })
        .sum();
    sum % 89 == 0
}

fn luhn_ok(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(index, digit)| {
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                *digit
            }
        })
        .sum();
    sum % 10 == 0
}
