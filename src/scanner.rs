// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Helpers for searching and replacing syntax in an expression while
// skipping escaped characters and, optionally, character classes.
//
// These helpers only step over `\` and the character following it, they
// do not know about multi-character tokens such as `\u{...}` or `\k<...>`,
// so a needle must be chosen with that in mind.

use crate::error::Error;

/// Marks a capturing group as synthetic, i.e. added by a rewrite and not
/// visible to the user. It follows the `(` of the group, optionally
/// preceded by a transfer target `$N`, e.g. `($E$...)` and `($2$E$...)`.
pub const EMULATION_MARKER: &str = "$E$";

/// Matches an emulation marker at the start of `rest` (i.e. following the
/// `(` of a capturing group), returns its length and the transfer target,
/// e.g. `$E$` -> `(3, None)` and `$2$E$` -> `(5, Some(2))`.
pub fn match_emulation_marker(rest: &str) -> Option<(usize, Option<usize>)> {
    if rest.starts_with(EMULATION_MARKER) {
        return Some((EMULATION_MARKER.len(), None));
    }

    let after = rest.strip_prefix('$')?;
    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !after[digits..].starts_with(EMULATION_MARKER) {
        return None;
    }

    let target = after[..digits].parse::<usize>().ok()?;
    Some((1 + digits + EMULATION_MARKER.len(), Some(target)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanContext {
    /// Outside of character classes.
    Default,
    /// Inside a character class, at any depth.
    CharClass,
}

/// Length of the token starting at `position`: either `\` with the
/// character following it, or a single character.
pub fn escaped_token_length(text: &str, position: usize) -> usize {
    let mut chars = text[position..].chars();
    match chars.next() {
        Some('\\') => 1 + chars.next().map_or(0, char::len_utf8),
        Some(c) => c.len_utf8(),
        None => 0,
    }
}

fn in_scan_context(context: Option<ScanContext>, class_depth: isize) -> bool {
    match context {
        None => true,
        Some(ScanContext::Default) => class_depth == 0,
        Some(ScanContext::CharClass) => class_depth != 0,
    }
}

/// Replaces the needle where it occurs unescaped and in the given context.
///
/// The matcher receives the whole input and a position, and returns the
/// length of the needle found at that position.
pub fn replace_unescaped<M, R>(
    input: &str,
    matcher: M,
    mut replacer: R,
    context: Option<ScanContext>,
) -> Result<String, Error>
where
    M: Fn(&str, usize) -> Option<usize>,
    R: FnMut(&str) -> Result<String, Error>,
{
    let mut result = String::with_capacity(input.len());
    let mut class_depth: isize = 0;
    let mut position = 0;

    while position < input.len() {
        if let Some(length) = matcher(input, position) {
            if in_scan_context(context, class_depth) {
                result.push_str(&replacer(&input[position..position + length])?);
                position += length;
                continue;
            }
        }

        let length = escaped_token_length(input, position);
        let m = &input[position..position + length];
        if m == "[" {
            class_depth += 1;
        } else if m == "]" {
            class_depth -= 1;
        }
        result.push_str(m);
        position += length;
    }

    Ok(result)
}

/// Finds the first unescaped occurrence of the needle at or after `from`,
/// returns its position and length.
pub fn find_unescaped<M>(
    input: &str,
    matcher: M,
    from: usize,
    context: Option<ScanContext>,
) -> Option<(usize, usize)>
where
    M: Fn(&str, usize) -> Option<usize>,
{
    let mut class_depth: isize = 0;
    let mut position = 0;

    while position < input.len() {
        if position >= from {
            if let Some(length) = matcher(input, position) {
                if in_scan_context(context, class_depth) {
                    return Some((position, length));
                }
            }
        }

        let length = escaped_token_length(input, position);
        match &input[position..position + length] {
            "[" => class_depth += 1,
            "]" => class_depth -= 1,
            _ => {}
        }
        position += length;
    }

    None
}

pub fn has_unescaped<M>(input: &str, matcher: M, context: Option<ScanContext>) -> bool
where
    M: Fn(&str, usize) -> Option<usize>,
{
    find_unescaped(input, matcher, 0, context).is_some()
}

/// Matches a literal needle.
pub fn literal(needle: &str) -> impl Fn(&str, usize) -> Option<usize> + '_ {
    move |input: &str, position: usize| {
        input[position..]
            .starts_with(needle)
            .then_some(needle.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturingOpener<'a> {
    pub length: usize,
    pub name: Option<&'a str>,
}

/// Matches `(` that is not followed by `?`, or a named group opener
/// `(?<name>`.
pub fn match_capturing_opener(rest: &str) -> Option<CapturingOpener<'_>> {
    if !rest.starts_with('(') {
        return None;
    }

    if !rest[1..].starts_with('?') {
        return Some(CapturingOpener {
            length: 1,
            name: None,
        });
    }

    match_named_capturing_opener(rest)
}

/// Matches `(?<name>`, where `name` is not `=` or `!`.
pub fn match_named_capturing_opener(rest: &str) -> Option<CapturingOpener<'_>> {
    let after = rest.strip_prefix("(?<")?;
    if after.starts_with('=') || after.starts_with('!') {
        return None;
    }

    let end = after.find('>')?;
    if end == 0 {
        return None;
    }

    Some(CapturingOpener {
        length: 3 + end + 1,
        name: Some(&after[..end]),
    })
}

/// Matches a numbered backreference `\N` where N does not start with `0`,
/// returns the length and the number.
///
/// A number too large for `usize` saturates, it is out of range anyway.
pub fn match_numbered_backreference(rest: &str) -> Option<(usize, usize)> {
    let after = rest.strip_prefix('\\')?;
    if !after.starts_with(|c: char| ('1'..='9').contains(&c)) {
        return None;
    }

    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    let number = after[..digits].parse::<usize>().unwrap_or(usize::MAX);
    Some((1 + digits, number))
}

/// Matches `\k<name>` and `\g<name>` style references with the given
/// prefix, returns the length and the name.
pub fn match_group_reference<'a>(rest: &'a str, prefix: &str) -> Option<(usize, &'a str)> {
    let after = rest.strip_prefix(prefix)?;
    let end = after.find('>')?;
    if end == 0 {
        return None;
    }
    Some((prefix.len() + end + 1, &after[..end]))
}

/// Finds the capturing group openers outside character classes, returns
/// their positions and openers.
///
/// The condition of a conditional group, e.g. the `(DEFINE)` of
/// `(?(DEFINE)...)`, is not a capturing group.
pub fn capturing_openers(expression: &str) -> Vec<(usize, CapturingOpener<'_>)> {
    let mut openers = vec![];
    let mut position = 0;
    while let Some((start, length)) = find_unescaped(
        expression,
        |input, position| {
            let rest = &input[position..];
            if rest.starts_with("(?(") {
                Some(3)
            } else {
                match_capturing_opener(rest).map(|o| o.length)
            }
        },
        position,
        Some(ScanContext::Default),
    ) {
        if let Some(opener) = match_capturing_opener(&expression[start..]) {
            openers.push((start, opener));
        }
        position = start + length;
    }
    openers
}

/// Counts capturing groups, named and unnamed, outside character classes.
pub fn count_captures(expression: &str) -> usize {
    capturing_openers(expression).len()
}

/// Returns the contents of the group whose contents start at
/// `contents_start`, up to (and excluding) the matching `)`.
///
/// If the group is unclosed, the rest of the expression is returned.
pub fn get_group_contents(expression: &str, contents_start: usize) -> &str {
    let mut class_depth = 0usize;
    let mut groups_open = 1usize;
    let mut position = contents_start;

    while position < expression.len() {
        let length = escaped_token_length(expression, position);
        match &expression[position..position + length] {
            "[" => class_depth += 1,
            "]" if class_depth > 0 => class_depth -= 1,
            "(" if class_depth == 0 => groups_open += 1,
            ")" if class_depth == 0 => {
                groups_open -= 1;
                if groups_open == 0 {
                    return &expression[contents_start..position];
                }
            }
            _ => {}
        }
        position += length;
    }

    &expression[contents_start..]
}

/// Shifts numbered backreferences outside character classes by `offset`.
pub fn adjust_numbered_backreferences(expression: &str, offset: usize) -> Result<String, Error> {
    if offset == 0 {
        return Ok(expression.to_owned());
    }

    replace_unescaped(
        expression,
        |input, position| match_numbered_backreference(&input[position..]).map(|(l, _)| l),
        |m| {
            let (_, number) = match_numbered_backreference(m).unwrap_or((0, 0));
            Ok(format!("\\{}", number.saturating_add(offset)))
        },
        Some(ScanContext::Default),
    )
}
