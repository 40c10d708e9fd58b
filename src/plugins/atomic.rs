// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Atomic groups are emulated with a lookahead that captures its contents,
// followed by a backreference to that capture:
//
// `(?>X)` -> `(?:(?=(X))\N)`
//
// The lookahead is atomic once it has matched, and the backreference
// consumes exactly what it matched. The added capture is synthetic, so
// numbered backreferences written by the user are renumbered to skip it.

use log::trace;

use crate::{
    context::noncapturing_opener_length,
    error::Error,
    scanner::{
        escaped_token_length, has_unescaped, literal, match_named_capturing_opener,
        match_numbered_backreference, replace_unescaped, ScanContext, EMULATION_MARKER,
    },
};

const ATOMIC_OPENER: &str = "(?>";

// `<$$N>` holds the backreference of an emulated group until the user
// backreferences are renumbered
const WRAPPED_BACKREFERENCE_PREFIX: &str = "<$$";

enum AtomicToken {
    NoncapturingOpener,
    CapturingOpener,
    Other,
}

fn lex_atomic_token(rest: &str) -> (AtomicToken, usize) {
    if let Some(length) = noncapturing_opener_length(rest) {
        return (AtomicToken::NoncapturingOpener, length);
    }

    if rest.starts_with('(') {
        let length = match_named_capturing_opener(rest).map_or(1, |o| o.length);
        return (AtomicToken::CapturingOpener, length);
    }

    (AtomicToken::Other, escaped_token_length(rest, 0))
}

pub fn atomic(expression: &str) -> Result<String, Error> {
    if !has_unescaped(expression, literal(ATOMIC_OPENER), Some(ScanContext::Default)) {
        return Ok(expression.to_owned());
    }

    let emulated_opener = format!("(?:(?=({}", EMULATION_MARKER);
    let mut expression = expression.to_owned();

    // user capture number -> capture number after emulation
    let mut capture_number_map: Vec<usize> = vec![0];
    let mut captures_before = 0;
    let mut atomic_count = 0;
    let mut scan_start = 0;

    loop {
        let mut processed = false;
        let mut class_depth = 0usize;
        let mut groups_open_in_atomic = 0usize;
        let mut atomic_start: Option<usize> = None;
        let mut position = scan_start;

        while position < expression.len() {
            let (token, length) = lex_atomic_token(&expression[position..]);
            let m = &expression[position..position + length];

            if m == "[" {
                class_depth += 1;
            } else if class_depth == 0 {
                match token {
                    AtomicToken::NoncapturingOpener if m == ATOMIC_OPENER && atomic_start.is_none() => {
                        atomic_start = Some(position);
                    }
                    AtomicToken::NoncapturingOpener => {
                        if atomic_start.is_some() {
                            groups_open_in_atomic += 1;
                        }
                    }
                    AtomicToken::CapturingOpener => {
                        if atomic_start.is_some() {
                            groups_open_in_atomic += 1;
                        } else {
                            captures_before += 1;
                            capture_number_map.push(captures_before + atomic_count);
                        }
                    }
                    AtomicToken::Other if m == ")" => {
                        if let Some(start) = atomic_start {
                            if groups_open_in_atomic == 0 {
                                atomic_count += 1;
                                let contents = &expression[start + ATOMIC_OPENER.len()..position];
                                let replacement = format!(
                                    "{}{})){}{}>)",
                                    emulated_opener,
                                    contents,
                                    WRAPPED_BACKREFERENCE_PREFIX,
                                    atomic_count + captures_before
                                );
                                trace!("atomic group {:?} -> {:?}", contents, replacement);

                                expression.replace_range(start..position + 1, &replacement);

                                // nested atomic groups are inside the rewritten span
                                scan_start = start + emulated_opener.len();
                                processed = true;
                                break;
                            }
                            groups_open_in_atomic -= 1;
                        }
                    }
                    AtomicToken::Other => {}
                }
            } else if m == "]" {
                class_depth -= 1;
            }

            position += length;
        }

        if !processed {
            break;
        }
    }

    replace_unescaped(
        &expression,
        |input, position| {
            let rest = &input[position..];
            match_numbered_backreference(rest)
                .map(|(length, _)| length)
                .or_else(|| match_wrapped_backreference(rest).map(|(length, _)| length))
        },
        |m| {
            if let Some((_, number)) = match_numbered_backreference(m) {
                return match capture_number_map.get(number) {
                    Some(mapped) => Ok(format!("\\{}", mapped)),
                    None => Err(Error::SemanticIncorrect(format!(
                        "Backreference \"{}\" greater than number of captures",
                        m
                    ))),
                };
            }

            let (_, number) = match_wrapped_backreference(m).unwrap_or((0, 0));
            Ok(format!("\\{}", number))
        },
        Some(ScanContext::Default),
    )
}

fn match_wrapped_backreference(rest: &str) -> Option<(usize, usize)> {
    let after = rest.strip_prefix(WRAPPED_BACKREFERENCE_PREFIX)?;
    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !after[digits..].starts_with('>') {
        return None;
    }

    let number = after[..digits].parse::<usize>().ok()?;
    Some((WRAPPED_BACKREFERENCE_PREFIX.len() + digits + 1, number))
}
