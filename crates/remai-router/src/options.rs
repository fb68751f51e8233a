//! Option schema and typed option parsing.
//!
//! Raw option values are checked against the command's declared schema and
//! converted into the command's own options type before any link of its
//! chain runs.

use std::collections::HashMap;

use remai_core::types::{CommandOption, OptionValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    Attachment,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Number => "number",
            OptionKind::Boolean => "boolean",
            OptionKind::Attachment => "attachment",
        }
    }

    fn accepts(&self, value: &OptionValue) -> bool {
        matches!(
            (self, value),
            (OptionKind::String, OptionValue::String(_))
                | (OptionKind::Integer, OptionValue::Integer(_))
                | (OptionKind::Number, OptionValue::Number(_) | OptionValue::Integer(_))
                | (OptionKind::Boolean, OptionValue::Boolean(_))
                | (OptionKind::Attachment, OptionValue::Attachment { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionChoice {
    pub name: String,
    pub value: String,
}

/// Declared option of a slash command.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub choices: Vec<OptionChoice>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl OptionSpec {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            choices: Vec::new(),
            min_value: None,
            max_value: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::String, name, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Number, name, description)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Attachment, name, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Check one raw value (or its absence) against this declaration.
    fn check(&self, value: Option<&OptionValue>) -> Result<(), OptionError> {
        let Some(value) = value else {
            return if self.required {
                Err(OptionError::Missing(self.name.clone()))
            } else {
                Ok(())
            };
        };

        if !self.kind.accepts(value) {
            return Err(OptionError::WrongType {
                name: self.name.clone(),
                expected: self.kind.as_str(),
                found: value.type_name(),
            });
        }

        let numeric = match value {
            OptionValue::Integer(i) => Some(*i as f64),
            OptionValue::Number(n) => Some(*n),
            _ => None,
        };
        if let Some(n) = numeric {
            let below = self.min_value.is_some_and(|min| n < min);
            let above = self.max_value.is_some_and(|max| n > max);
            if below || above {
                return Err(OptionError::OutOfRange {
                    name: self.name.clone(),
                    value: n,
                    min: self.min_value,
                    max: self.max_value,
                });
            }
        }

        if let (false, OptionValue::String(s)) = (self.choices.is_empty(), value) {
            if !self.choices.iter().any(|c| &c.value == s) {
                return Err(OptionError::Invalid {
                    name: self.name.clone(),
                    reason: format!("'{s}' is not one of the offered choices"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptionError {
    #[error("missing required option '{0}'")]
    Missing(String),

    #[error("option '{name}' must be a {expected}, got a {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("option '{name}' is out of range: {value} (allowed {})", describe_range(.min, .max))]
    OutOfRange {
        name: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("invalid option '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("unknown option '{0}'")]
    Unknown(String),
}

fn describe_range(min: &Option<f64>, max: &Option<f64>) -> String {
    match (*min, *max) {
        (Some(min), Some(max)) => format!("{min}..={max}"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => "any".to_string(),
    }
}

/// Raw option values of one invocation, keyed by option name.
#[derive(Debug, Clone, Default)]
pub struct OptionMap {
    values: HashMap<String, OptionValue>,
}

impl OptionMap {
    pub fn new(options: &[CommandOption]) -> Self {
        Self {
            values: options
                .iter()
                .map(|o| (o.name.clone(), o.value.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check every value against `schema`. Names the schema does not
    /// declare are rejected.
    pub fn validate(&self, schema: &[OptionSpec]) -> Result<(), OptionError> {
        if let Some(unknown) = self
            .values
            .keys()
            .find(|name| !schema.iter().any(|spec| &spec.name == *name))
        {
            return Err(OptionError::Unknown(unknown.clone()));
        }
        for spec in schema {
            spec.check(self.get(&spec.name))?;
        }
        Ok(())
    }

    pub fn string(&self, name: &str) -> Result<Option<String>, OptionError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(wrong_type(name, "string", other)),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<String, OptionError> {
        self.string(name)?
            .ok_or_else(|| OptionError::Missing(name.to_string()))
    }

    /// Integers are accepted where a number is expected.
    pub fn number(&self, name: &str) -> Result<Option<f64>, OptionError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Number(n)) => Ok(Some(*n)),
            Some(OptionValue::Integer(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(wrong_type(name, "number", other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, OptionError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(wrong_type(name, "integer", other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<Option<bool>, OptionError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(name, "boolean", other)),
        }
    }

    /// URL of an attachment option.
    pub fn attachment_url(&self, name: &str) -> Result<Option<String>, OptionError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Attachment { url, .. }) => Ok(Some(url.clone())),
            Some(other) => Err(wrong_type(name, "attachment", other)),
        }
    }
}

fn wrong_type(name: &str, expected: &'static str, found: &OptionValue) -> OptionError {
    OptionError::WrongType {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Strongly typed options of one command, built once per invocation.
pub trait CommandOptions: Sized + Send + Sync + 'static {
    fn from_options(options: &OptionMap) -> Result<Self, OptionError>;
}

impl CommandOptions for () {
    fn from_options(_options: &OptionMap) -> Result<Self, OptionError> {
        Ok(())
    }
}
