// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Subroutines `\g<name>` are expanded in place to a copy of the referenced
// group's pattern, wrapped in a synthetic capturing group:
//
// `(?<a>x)\g<a>` -> `(?<a>x)($E$x)`
//
// Every capturing group inside a copy is synthetic as well, so the visible
// capture numbering is that of the user's expression. Numbered
// backreferences are renumbered to account for the added groups:
//
// - a backreference inside a copy that refers to a group within the
//   copied group refers to the copy of that group,
// - any other backreference refers to the group it referred to before
//   the expansion.
//
// A trailing `(?(DEFINE)...)` group holds named groups that are only used
// as subroutine targets, it is removed after expansion.

use std::collections::HashMap;

use log::trace;

use crate::{
    error::Error,
    scanner::{
        capturing_openers, count_captures, escaped_token_length, find_unescaped,
        get_group_contents, has_unescaped, literal, match_capturing_opener,
        match_emulation_marker, match_group_reference, match_named_capturing_opener,
        match_numbered_backreference, ScanContext, EMULATION_MARKER,
    },
};

const SUBROUTINE_PREFIX: &str = "\\g<";
const NAMED_BACKREFERENCE_PREFIX: &str = "\\k<";
const DEFINE_OPENER: &str = "(?(DEFINE)";

#[derive(Debug, Clone, Copy)]
struct NamedGroup<'a> {
    contents: &'a str,
    // `false` if another group has the same name
    is_unique: bool,
}

// A subroutine expansion that has not been closed yet
#[derive(Debug)]
struct OpenSubroutine<'a> {
    name: String,
    contents: &'a str,
    // unclosed `(` of the expansion, including its wrapper
    unclosed: usize,
    // number of the referenced group in the user's expression
    first_capture: usize,
    // the referenced group and the groups within it
    capture_count: usize,
    // number of the wrapper group in the output
    wrapper_number: usize,
}

impl OpenSubroutine<'_> {
    // the number of the copy of group `number`, if it is within the
    // referenced group
    fn copy_of(&self, number: usize) -> Option<usize> {
        (number >= self.first_capture && number < self.first_capture + self.capture_count)
            .then(|| self.wrapper_number + number - self.first_capture)
    }
}

enum SubroutineToken {
    Subroutine(String),
    CapturingOpener { marked: bool },
    NumberedBackreference(usize),
    NamedBackreference(String),
    Other,
}

fn lex_subroutine_token(rest: &str) -> (SubroutineToken, usize) {
    if rest.starts_with(DEFINE_OPENER) {
        return (SubroutineToken::Other, DEFINE_OPENER.len());
    }

    if let Some((length, name)) = match_group_reference(rest, SUBROUTINE_PREFIX) {
        if !name.contains('&') {
            return (SubroutineToken::Subroutine(name.to_owned()), length);
        }
    }

    if let Some(opener) = match_capturing_opener(rest) {
        let marked = opener.name.is_none() && match_emulation_marker(&rest[1..]).is_some();
        return (SubroutineToken::CapturingOpener { marked }, opener.length);
    }

    if let Some((length, number)) = match_numbered_backreference(rest) {
        return (SubroutineToken::NumberedBackreference(number), length);
    }

    if let Some((length, name)) = match_group_reference(rest, NAMED_BACKREFERENCE_PREFIX) {
        return (SubroutineToken::NamedBackreference(name.to_owned()), length);
    }

    (SubroutineToken::Other, escaped_token_length(rest, 0))
}

fn match_named_opener(input: &str, position: usize) -> Option<usize> {
    match_named_capturing_opener(&input[position..]).map(|o| o.length)
}

// calls `f` with the name and the contents start of every named group
fn for_each_named_group<'a, F>(expression: &'a str, mut f: F)
where
    F: FnMut(&'a str, usize),
{
    let mut position = 0;
    while let Some((start, length)) = find_unescaped(
        expression,
        match_named_opener,
        position,
        Some(ScanContext::Default),
    ) {
        if let Some(name) = match_named_capturing_opener(&expression[start..]).and_then(|o| o.name) {
            f(name, start + length);
        }
        position = start + length;
    }
}

fn named_groups(expression: &str) -> HashMap<&str, NamedGroup<'_>> {
    let mut groups: HashMap<&str, NamedGroup> = HashMap::new();

    for_each_named_group(expression, |name, contents_start| {
        groups
            .entry(name)
            .and_modify(|group| group.is_unique = false)
            .or_insert_with(|| NamedGroup {
                contents: get_group_contents(expression, contents_start),
                is_unique: true,
            });
    });

    groups
}

fn has_named_group(expression: &str, name: &str) -> bool {
    has_unescaped(
        expression,
        |input, position| {
            match_named_capturing_opener(&input[position..])
                .filter(|o| o.name == Some(name))
                .map(|o| o.length)
        },
        Some(ScanContext::Default),
    )
}

// the number of the first group with the given name
fn capture_number(expression: &str, name: &str) -> Option<usize> {
    capturing_openers(expression)
        .iter()
        .position(|(_, opener)| opener.name == Some(name))
        .map(|index| index + 1)
}

fn count_unescaped_parens(expression: &str) -> usize {
    let mut count = 0;
    let mut position = 0;
    while let Some((start, length)) =
        find_unescaped(expression, literal("("), position, Some(ScanContext::Default))
    {
        count += 1;
        position = start + length;
    }
    count
}

/// Expands subroutines `\g<name>` and removes the trailing DEFINE group.
pub fn subroutines(expression: &str) -> Result<String, Error> {
    let named_groups = named_groups(expression);
    let expanded = expand_subroutines(expression, &named_groups)?;
    strip_definition_group(&expanded, &named_groups)
}

fn expand_subroutines(
    expression: &str,
    named_groups: &HashMap<&str, NamedGroup>,
) -> Result<String, Error> {
    if !has_unescaped(
        expression,
        literal(SUBROUTINE_PREFIX),
        Some(ScanContext::Default),
    ) {
        return Ok(expression.to_owned());
    }

    let capture_count = count_captures(expression);
    let wrapped_opener = format!("({}", EMULATION_MARKER);

    let mut result = expression.to_owned();
    let mut stack: Vec<OpenSubroutine> = vec![];

    // user capture number -> capture number in the output
    let mut capture_number_map: Vec<usize> = vec![0];
    let mut captures_passed = 0;

    // backreferences outside expansions may refer to groups not passed yet,
    // they are renumbered at the end: (position, length, number)
    let mut deferred: Vec<(usize, usize, usize)> = vec![];

    let mut class_depth = 0usize;
    let mut position = 0;

    while position < result.len() {
        let (token, length) = lex_subroutine_token(&result[position..]);
        let m = &result[position..position + length];

        if m == "[" {
            class_depth += 1;
            position += length;
            continue;
        }

        if class_depth > 0 {
            if m == "]" {
                class_depth -= 1;
            }
            position += length;
            continue;
        }

        match token {
            SubroutineToken::Subroutine(name) => {
                let group = named_groups.get(name.as_str()).ok_or_else(|| {
                    Error::SemanticIncorrect(format!(
                        "Invalid named capture referenced by subroutine \"{}\"",
                        m
                    ))
                })?;

                if stack.iter().any(|s| s.name == name) {
                    return Err(Error::SemanticIncorrect(format!(
                        "Subroutine \"{}\" followed a recursive reference",
                        m
                    )));
                }

                let value = format!("{}{})", wrapped_opener, group.contents);
                let first_capture = capture_number(expression, &name).unwrap_or(0);

                trace!("subroutine {} -> {}", m, value);

                stack.push(OpenSubroutine {
                    unclosed: count_unescaped_parens(&value),
                    first_capture,
                    capture_count: count_captures(group.contents) + 1,
                    wrapper_number: captures_passed + 1,
                    contents: group.contents,
                    name,
                });

                // the expansion is scanned next
                result.replace_range(position..position + length, &value);
            }
            SubroutineToken::CapturingOpener { marked } => {
                captures_passed += 1;

                if stack.is_empty() {
                    capture_number_map.push(captures_passed);
                    position += length;
                } else if marked {
                    position += length;
                } else {
                    result.replace_range(position..position + length, &wrapped_opener);
                    position += wrapped_opener.len();
                }
            }
            SubroutineToken::NumberedBackreference(number) => {
                if number > capture_count {
                    return Err(Error::SemanticIncorrect(format!(
                        "Backreference \"{}\" greater than number of captures",
                        m
                    )));
                }

                match stack.iter().rev().find_map(|s| s.copy_of(number)) {
                    Some(copy) => {
                        let replacement = format!("\\{}", copy);
                        result.replace_range(position..position + length, &replacement);
                        position += replacement.len();
                    }
                    None => {
                        deferred.push((position, length, number));
                        position += length;
                    }
                }
            }
            SubroutineToken::NamedBackreference(name) => {
                let within_expansion = stack
                    .iter()
                    .any(|s| s.name == name || has_named_group(s.contents, &name));

                match capture_number(expression, &name).filter(|_| within_expansion) {
                    Some(number) => {
                        // rescanned as a numbered backreference
                        result.replace_range(position..position + length, &format!("\\{}", number));
                    }
                    None => position += length,
                }
            }
            SubroutineToken::Other => {
                if m == ")" {
                    if let Some(top) = stack.last_mut() {
                        top.unclosed -= 1;
                        if top.unclosed == 0 {
                            stack.pop();
                        }
                    }
                }
                position += length;
            }
        }
    }

    // positions before the last replacement are not shifted by it
    for (position, length, number) in deferred.into_iter().rev() {
        let mapped = capture_number_map.get(number).ok_or_else(|| {
            Error::SemanticIncorrect(format!(
                "Backreference \"\\{}\" greater than number of captures",
                number
            ))
        })?;
        result.replace_range(position..position + length, &format!("\\{}", mapped));
    }

    Ok(result)
}

fn strip_definition_group(
    expression: &str,
    named_groups: &HashMap<&str, NamedGroup>,
) -> Result<String, Error> {
    let Some((start, opener_length)) = find_unescaped(
        expression,
        literal(DEFINE_OPENER),
        0,
        Some(ScanContext::Default),
    ) else {
        return Ok(expression.to_owned());
    };

    let contents_start = start + opener_length;
    let contents = get_group_contents(expression, contents_start);
    let end = contents_start + contents.len();

    if end >= expression.len() {
        return Err(Error::SyntaxIncorrect("DEFINE group is unclosed".to_owned()));
    }

    if end + 1 < expression.len() {
        return Err(Error::SemanticIncorrect(
            "DEFINE group allowed only at the end of an expression".to_owned(),
        ));
    }

    check_definitions(contents, named_groups)?;

    let remaining = &expression[..start];
    check_backreferences_to_definitions(remaining, named_groups)?;

    Ok(remaining.to_owned())
}

// only named groups and separators are allowed at the top level
fn check_definitions(contents: &str, named_groups: &HashMap<&str, NamedGroup>) -> Result<(), Error> {
    let check_unique = |name: &str| -> Result<(), Error> {
        match named_groups.get(name) {
            Some(group) if !group.is_unique => Err(Error::SemanticIncorrect(format!(
                "Duplicate group name \"{}\" within DEFINE",
                name
            ))),
            _ => Ok(()),
        }
    };

    let mut position = 0;
    while position < contents.len() {
        let rest = &contents[position..];

        if let Some(opener) = match_named_capturing_opener(rest) {
            check_unique(opener.name.unwrap_or_default())?;

            let group_contents = get_group_contents(contents, position + opener.length);
            let mut result = Ok(());
            for_each_named_group(group_contents, |name, _| {
                if result.is_ok() {
                    result = check_unique(name);
                }
            });
            result?;

            position += opener.length + group_contents.len() + 1;
            continue;
        }

        if rest.starts_with("(?:)") {
            position += 4;
            continue;
        }

        return Err(Error::SemanticIncorrect(
            "DEFINE group includes unsupported syntax at top level".to_owned(),
        ));
    }

    Ok(())
}

fn check_backreferences_to_definitions(
    remaining: &str,
    named_groups: &HashMap<&str, NamedGroup>,
) -> Result<(), Error> {
    let mut position = 0;
    while let Some((start, length)) = find_unescaped(
        remaining,
        |input, position| {
            match_group_reference(&input[position..], NAMED_BACKREFERENCE_PREFIX).map(|(l, _)| l)
        },
        position,
        Some(ScanContext::Default),
    ) {
        let m = &remaining[start..start + length];
        let name = &m[NAMED_BACKREFERENCE_PREFIX.len()..m.len() - 1];
        if named_groups.contains_key(name) && !has_named_group(remaining, name) {
            return Err(Error::SemanticIncorrect(format!(
                "Backreference \"{}\" refers to a group declared only within DEFINE",
                m
            )));
        }
        position = start + length;
    }

    Ok(())
}
