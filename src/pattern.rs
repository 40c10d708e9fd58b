// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{error::Error, options::Flags};

/// A regex fragment that is embedded without escaping.
///
/// It is still atomized (wrapped) where needed, so that it cannot change
/// the meaning of the tokens around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    value: String,
}

impl Pattern {
    pub fn new(value: &str) -> Self {
        Pattern {
            value: value.to_owned(),
        }
    }

    /// Joins segments and values without escaping anything,
    /// e.g. `["a", "c"]` and `["b"]` give `abc`.
    pub fn from_parts(segments: &[&str], values: &[&str]) -> Result<Self, Error> {
        check_parts_count(segments.len(), values.len())?;

        let mut value = String::new();
        for (idx, segment) in segments.iter().enumerate() {
            value.push_str(segment);
            if let Some(v) = values.get(idx) {
                value.push_str(v);
            }
        }
        Ok(Pattern { value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// An independent, complete regex with its own flags.
///
/// Its `i`, `m` and `s` flags are reconciled with those of the enclosing
/// expression, and its numbered backreferences are renumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subexpression {
    source: String,
    flags: Flags,
}

impl Subexpression {
    pub fn new(source: &str, flags: Flags) -> Self {
        Subexpression {
            source: source.to_owned(),
            flags: flags.local(),
        }
    }

    pub fn with_flags(source: &str, flags: &str) -> Result<Self, Error> {
        Ok(Subexpression::new(source, Flags::parse(flags)?))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    /// Escaped for the context it lands in.
    Text(String),
    Pattern(Pattern),
    Subexpression(Subexpression),
}

impl From<&str> for Substitution {
    fn from(value: &str) -> Self {
        Substitution::Text(value.to_owned())
    }
}

impl From<String> for Substitution {
    fn from(value: String) -> Self {
        Substitution::Text(value)
    }
}

impl From<Pattern> for Substitution {
    fn from(value: Pattern) -> Self {
        Substitution::Pattern(value)
    }
}

impl From<Subexpression> for Substitution {
    fn from(value: Subexpression) -> Self {
        Substitution::Subexpression(value)
    }
}

/// Raw segments interleaved with substitutions, there is always one more
/// segment than substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<String>,
    pub substitutions: Vec<Substitution>,
}

impl Default for Template {
    fn default() -> Self {
        Template {
            segments: vec![String::new()],
            substitutions: vec![],
        }
    }
}

impl Template {
    pub fn new() -> Self {
        Template::default()
    }

    pub fn from_parts(segments: Vec<String>, substitutions: Vec<Substitution>) -> Result<Self, Error> {
        check_parts_count(segments.len(), substitutions.len())?;
        Ok(Template {
            segments,
            substitutions,
        })
    }

    /// Appends raw regex source to the last segment.
    pub fn raw(mut self, source: &str) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.push_str(source);
        }
        self
    }

    pub fn interpolate(mut self, substitution: impl Into<Substitution>) -> Self {
        self.substitutions.push(substitution.into());
        self.segments.push(String::new());
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.interpolate(Substitution::Text(text.to_owned()))
    }

    pub fn pattern(self, pattern: &str) -> Self {
        self.interpolate(Pattern::new(pattern))
    }

    pub fn subexpression(self, subexpression: Subexpression) -> Self {
        self.interpolate(subexpression)
    }
}

impl From<&str> for Template {
    fn from(value: &str) -> Self {
        Template::new().raw(value)
    }
}

fn check_parts_count(segments: usize, values: usize) -> Result<(), Error> {
    if segments != values + 1 {
        return Err(Error::OptionsIncorrect(format!(
            "Expected {} segments for {} interpolated values, found {}",
            values + 1,
            values,
            segments
        )));
    }
    Ok(())
}
