// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{
    capturemap::{CaptureMap, CaptureSlot},
    context::{CharClassContext, Context, RegexContext},
};

impl Display for RegexContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegexContext::Default => f.write_str("default"),
            RegexContext::CharClass => f.write_str("character class"),
            RegexContext::GroupName => f.write_str("group name"),
            RegexContext::EnclosedToken => f.write_str("enclosed token"),
            RegexContext::IntervalQuantifier => f.write_str("interval quantifier"),
            RegexContext::InvalidIncompleteToken => f.write_str("incomplete token"),
        }
    }
}

impl Display for CharClassContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharClassContext::Default => f.write_str("default"),
            CharClassContext::Range => f.write_str("range"),
            CharClassContext::EnclosedToken => f.write_str("enclosed token"),
            CharClassContext::QToken => f.write_str("string literal"),
            CharClassContext::InvalidIncompleteToken => f.write_str("incomplete token"),
        }
    }
}

impl Display for Context {
    // for debug
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.regex_context == RegexContext::CharClass {
            write!(
                f,
                "{} (depth {}, {})",
                self.regex_context, self.char_class_depth, self.char_class_context
            )
        } else {
            write!(f, "{}", self.regex_context)
        }
    }
}

impl Display for CaptureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureSlot::Real(n) => write!(f, "{}", n),
            CaptureSlot::Synthetic { transfer_to: None } => f.write_str("-"),
            CaptureSlot::Synthetic {
                transfer_to: Some(n),
            } => write!(f, "->{}", n),
        }
    }
}

impl Display for CaptureMap {
    // e.g. `[0, 1, -, 2, ->1]`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: Vec<String> = self.iter().map(|slot| slot.to_string()).collect();
        write!(f, "[{}]", s.join(", "))
    }
}
