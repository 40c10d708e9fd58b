// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use log::trace;

use crate::{context::DOUBLE_PUNCTUATOR_CHARS, error::Error, scanner::escaped_token_length};

// chars that may be escaped in a class with Unicode sets, but not without
const UNICODE_SETS_ONLY_ESCAPE_CHARS: &str = "&!#%,:;<=>@`~";

/// Applies the class rules of Unicode-sets mode to an expression compiled
/// without it.
///
/// Syntax that means something else without Unicode sets is rejected, and
/// the escapes that are only allowed with Unicode sets are removed, since
/// those chars are literal anyway.
pub fn legacy(expression: &str) -> Result<String, Error> {
    let mut transformed = String::with_capacity(expression.len());
    let mut in_class = false;
    let mut position = 0;

    while position < expression.len() {
        let rest = &expression[position..];
        let length = escaped_token_length(rest, 0);
        let m = &rest[..length];
        position += length;

        match m {
            "[" => {
                if in_class {
                    return Err(Error::SyntaxIncorrect(
                        "Invalid nested character class when Unicode sets are not supported"
                            .to_owned(),
                    ));
                }
                in_class = true;

                // `[^` is a single token
                if rest[1..].starts_with('^') {
                    transformed.push_str("[^");
                    position += 1;
                    continue;
                }
            }
            "]" => in_class = false,
            "(" | ")" if in_class => {
                return Err(Error::SyntaxIncorrect(format!(
                    "Invalid unescaped \"{}\" in character class",
                    m
                )));
            }
            _ if in_class => {
                let mut chars = m.chars();
                let first = chars.next().unwrap_or_default();

                let doubled = DOUBLE_PUNCTUATOR_CHARS.contains(first) || first == '-';
                if doubled && rest[length..].starts_with(first) {
                    return Err(Error::SyntaxIncorrect(format!(
                        "Invalid double punctuator \"{}{}\" when Unicode sets are not supported",
                        first, first
                    )));
                }

                let escaped = chars.next().filter(|c| {
                    first == '\\' && UNICODE_SETS_ONLY_ESCAPE_CHARS.contains(*c)
                });
                if let Some(c) = escaped {
                    trace!("unescape {} in class", m);
                    transformed.push(c);
                    continue;
                }
            }
            _ => {}
        }

        transformed.push_str(m);
    }

    Ok(transformed)
}
