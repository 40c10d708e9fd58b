// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::ops::{Index, Range};

use crate::{
    backend::lower,
    capturemap::{CaptureMap, CaptureSlot},
    compiler::{compile_for, Compiled},
    error::Error,
    options::{Capabilities, Flags, Options},
    pattern::Template,
};

/// A compiled expression on top of `fancy_regex`.
///
/// Captures are reported with the numbering of the user's expression:
/// groups added by the emulation are hidden, or their matches are
/// transferred to the user groups they stand for.
#[derive(Debug, Clone)]
pub struct Regex {
    backend: fancy_regex::Regex,
    expression: String,
    flags: Flags,
    capture_map: CaptureMap,

    // names of the user groups, index 0 is the whole match
    capture_names: Vec<Option<String>>,
}

impl Regex {
    pub fn new(expression: &str) -> Result<Self, Error> {
        Regex::from_template(&Template::from(expression), &Options::default())
    }

    pub fn with_options(expression: &str, options: &Options) -> Result<Self, Error> {
        Regex::from_template(&Template::from(expression), options)
    }

    /// `fancy_regex` supports modifier groups, so the capabilities in
    /// `options` only decide the Unicode-set mode.
    pub fn from_template(template: &Template, options: &Options) -> Result<Self, Error> {
        let capabilities = Capabilities {
            pattern_modifiers: true,
            ..options.capabilities
        };
        Regex::from_compiled(compile_for(template, options, &capabilities)?)
    }

    pub fn from_compiled(compiled: Compiled) -> Result<Self, Error> {
        let Compiled {
            expression,
            flags,
            capture_map,
        } = compiled;

        let lowered = lower(&expression).map_err(|e| e.with_expression(&expression))?;

        let mut builder = fancy_regex::RegexBuilder::new(&lowered.expression);
        builder.case_insensitive(flags.contains(Flags::IGNORE_CASE));
        builder.multi_line(flags.contains(Flags::MULTI_LINE));
        builder.dot_matches_new_line(flags.contains(Flags::DOT_ALL));
        let backend = builder
            .build()
            .map_err(|e| Error::from(e).with_expression(&expression))?;

        let mut capture_names = vec![None; capture_map.real_len()];
        for (index, name) in lowered.group_names.into_iter().enumerate() {
            if let Some(CaptureSlot::Real(number)) = capture_map.get(index) {
                if let Some(slot) = capture_names.get_mut(number) {
                    *slot = name;
                }
            }
        }

        Ok(Regex {
            backend,
            expression,
            flags,
            capture_map,
            capture_names,
        })
    }

    /// The generated expression.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn capture_map(&self) -> &CaptureMap {
        &self.capture_map
    }

    /// Names of the user groups, the first item is the whole match.
    pub fn capture_names(&self) -> impl Iterator<Item = Option<&str>> {
        self.capture_names.iter().map(|name| name.as_deref())
    }

    pub fn is_match(&self, text: &str) -> Result<bool, Error> {
        Ok(self.backend.is_match(text)?)
    }

    pub fn find<'a, 'b>(&'a self, text: &'b str) -> Result<Option<Match<'a, 'b>>, Error> {
        let found = self.backend.find(text)?;
        Ok(found.map(|m| Match::new(m.start(), m.end(), None, m.as_str())))
    }

    pub fn find_iter<'a, 'b>(&'a self, text: &'b str) -> Matches<'a, 'b> {
        Matches {
            inner: self.backend.find_iter(text),
        }
    }

    pub fn captures<'a, 'b>(&'a self, text: &'b str) -> Result<Option<Captures<'a, 'b>>, Error> {
        let captures = self.backend.captures(text)?;
        Ok(captures.map(|c| self.map_captures(&c)))
    }

    pub fn captures_iter<'a, 'b>(&'a self, text: &'b str) -> CaptureMatches<'a, 'b> {
        CaptureMatches {
            regex: self,
            inner: self.backend.captures_iter(text),
        }
    }

    fn map_captures<'a, 'b>(&'a self, captures: &fancy_regex::Captures<'b>) -> Captures<'a, 'b> {
        let mut matches: Vec<Option<Match>> = vec![None; self.capture_names.len()];

        // in group order, so the last participating group wins
        for (index, slot) in self.capture_map.iter().enumerate() {
            let number = match slot {
                CaptureSlot::Real(number) => *number,
                CaptureSlot::Synthetic {
                    transfer_to: Some(number),
                } => *number,
                CaptureSlot::Synthetic { transfer_to: None } => continue,
            };

            let Some(m) = captures.get(index) else {
                continue;
            };

            if let Some(item) = matches.get_mut(number) {
                let name = self.capture_names.get(number).and_then(|n| n.as_deref());
                *item = Some(Match::new(m.start(), m.end(), name, m.as_str()));
            }
        }

        Captures { matches }
    }
}

pub struct CaptureMatches<'a, 'b> {
    regex: &'a Regex,
    inner: fancy_regex::CaptureMatches<'a, 'b>,
}

impl<'a, 'b> Iterator for CaptureMatches<'a, 'b> {
    type Item = Result<Captures<'a, 'b>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let captures = self.inner.next()?;
        Some(
            captures
                .map(|c| self.regex.map_captures(&c))
                .map_err(Error::from),
        )
    }
}

pub struct Matches<'a, 'b> {
    inner: fancy_regex::Matches<'a, 'b>,
}

impl<'a, 'b> Iterator for Matches<'a, 'b> {
    type Item = Result<Match<'a, 'b>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.inner.next()?;
        Some(
            found
                .map(|m| Match::new(m.start(), m.end(), None, m.as_str()))
                .map_err(Error::from),
        )
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Captures<'a, 'b> {
    pub matches: Vec<Option<Match<'a, 'b>>>,
}

impl Captures<'_, '_> {
    // the following methods are intended to
    // be compatible with the 'Captures' API of crate 'regex':
    // https://docs.rs/regex/latest/regex/struct.Captures.html

    pub fn get(&self, index: usize) -> Option<&Match<'_, '_>> {
        self.matches.get(index).and_then(Option::as_ref)
    }

    pub fn name(&self, name: &str) -> Option<&Match<'_, '_>> {
        self.matches
            .iter()
            .flatten()
            .find(|item| item.name == Some(name))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<usize> for Captures<'_, '_> {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index)
            .unwrap_or_else(|| panic!("No capture group matched at index {}.", index))
            .as_str()
    }
}

impl Index<&str> for Captures<'_, '_> {
    type Output = str;

    fn index(&self, name: &str) -> &Self::Output {
        self.name(name)
            .unwrap_or_else(|| panic!("No capture group named \"{}\" matched.", name))
            .as_str()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Match<'a, 'b> {
    pub start: usize, // the position of utf-8 byte stream (value included)
    pub end: usize,   // the position of utf-8 byte stream (value excluded)
    pub name: Option<&'a str>,
    pub value: &'b str,
}

impl<'a, 'b> Match<'a, 'b> {
    pub fn new(start: usize, end: usize, name: Option<&'a str>, value: &'b str) -> Self {
        Match {
            start,
            end,
            name,
            value,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn range(&self) -> Range<usize> {
        Range {
            start: self.start,
            end: self.end,
        }
    }

    pub fn as_str(&self) -> &'b str {
        self.value
    }
}
