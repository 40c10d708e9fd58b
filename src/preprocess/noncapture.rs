// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    context::{Context, RegexContext, TokenIter},
    error::Error,
};

use super::Preprocessed;

/// Implicit flag `n`: unnamed groups `(...)` become non-capturing, only
/// named groups capture.
///
/// Numbered backreferences are rejected since they would refer to
/// different groups than the user intended.
pub fn remove_capturing_parens(segment: &str, context: Context) -> Result<Preprocessed, Error> {
    let mut context = context;
    let mut transformed = String::with_capacity(segment.len());

    for token in TokenIter::new(segment, 0) {
        context.apply(&token);
        let m = token.value;

        if context.regex_context == RegexContext::Default {
            if m == "(" {
                transformed.push_str("(?:");
                continue;
            }

            if is_numbered_backreference(m) {
                return Err(Error::SyntaxIncorrect(format!(
                    "Invalid decimal escape \"{}\" with implicit flag n; replace with named backreference",
                    m
                )));
            }
        }

        transformed.push_str(m);
    }

    context.last_scanned_offset = segment.len();

    Ok(Preprocessed {
        transformed,
        context,
    })
}

fn is_numbered_backreference(m: &str) -> bool {
    let bytes = m.as_bytes();
    bytes.len() >= 2 && bytes[0] == b'\\' && (b'1'..=b'9').contains(&bytes[1])
}
