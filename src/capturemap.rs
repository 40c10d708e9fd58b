// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    error::Error,
    scanner::{
        capturing_openers, find_unescaped, match_emulation_marker, match_group_reference,
        match_numbered_backreference, ScanContext,
    },
};

/// What a capturing group of the generated expression stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSlot {
    /// A group written by the user, with its number as the user sees it.
    Real(usize),

    /// A group added by a rewrite. Its match is hidden, or copied to the
    /// user group `transfer_to` when the group participated.
    Synthetic { transfer_to: Option<usize> },
}

/// Maps the groups of the generated expression to the groups of the
/// user's expression.
///
/// Index 0 is the whole match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMap {
    slots: Vec<CaptureSlot>,
}

impl Default for CaptureMap {
    fn default() -> Self {
        CaptureMap {
            slots: vec![CaptureSlot::Real(0)],
        }
    }
}

impl CaptureMap {
    /// The slot of the engine group `index`.
    pub fn get(&self, index: usize) -> Option<CaptureSlot> {
        self.slots.get(index).copied()
    }

    /// The number of engine groups, including the whole match.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The number of user groups, including the whole match.
    pub fn real_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, CaptureSlot::Real(_)))
            .count()
    }

    /// `true` if no group is synthetic, so the engine groups are the user
    /// groups.
    pub fn is_identity(&self) -> bool {
        self.real_len() == self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptureSlot> {
        self.slots.iter()
    }
}

/// Removes the emulation markers from the expression and records which
/// groups are synthetic.
///
/// Backreferences are checked against the resulting groups.
pub fn build_capture_map(expression: &str) -> Result<(String, CaptureMap), Error> {
    let mut transformed = String::with_capacity(expression.len());
    let mut capture_map = CaptureMap::default();
    let mut real_count = 0;
    let mut copied = 0;

    for (start, opener) in capturing_openers(expression) {
        if opener.name.is_none() {
            if let Some((length, transfer_to)) = match_emulation_marker(&expression[start + 1..]) {
                transformed.push_str(&expression[copied..start + 1]);
                copied = start + 1 + length;
                capture_map.slots.push(CaptureSlot::Synthetic { transfer_to });
                continue;
            }
        }

        real_count += 1;
        capture_map.slots.push(CaptureSlot::Real(real_count));
    }
    transformed.push_str(&expression[copied..]);

    for slot in capture_map.iter() {
        if let CaptureSlot::Synthetic {
            transfer_to: Some(target),
        } = slot
        {
            if *target == 0 || *target > real_count {
                return Err(Error::SemanticIncorrect(format!(
                    "Transfer target {} greater than number of captures",
                    target
                )));
            }
        }
    }

    check_backreferences(&transformed, capture_map.len() - 1)?;

    Ok((transformed, capture_map))
}

fn check_backreferences(expression: &str, group_count: usize) -> Result<(), Error> {
    let names: Vec<&str> = capturing_openers(expression)
        .into_iter()
        .filter_map(|(_, opener)| opener.name)
        .collect();

    let mut position = 0;
    while let Some((start, length)) = find_unescaped(
        expression,
        |input, position| {
            let rest = &input[position..];
            match_numbered_backreference(rest)
                .map(|(length, _)| length)
                .or_else(|| match_group_reference(rest, "\\k<").map(|(length, _)| length))
        },
        position,
        Some(ScanContext::Default),
    ) {
        let m = &expression[start..start + length];

        if let Some((_, number)) = match_numbered_backreference(m) {
            if number > group_count {
                return Err(Error::SemanticIncorrect(format!(
                    "Backreference \"{}\" greater than number of captures",
                    m
                )));
            }
        } else if let Some((_, name)) = match_group_reference(m, "\\k<") {
            if !names.contains(&name) {
                return Err(Error::SemanticIncorrect(format!(
                    "Backreference \"{}\" to an undefined group name",
                    m
                )));
            }
        }

        position = start + length;
    }

    Ok(())
}
