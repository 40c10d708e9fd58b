// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Lowers a compiled expression to what `fancy_regex` accepts.
//
// - `fancy_regex` refuses numbered backreferences once a named group is
//   present, and the emulations always emit numbered ones. So every named
//   group becomes unnamed, and `\k<name>` becomes `(?:\N)`. The names are
//   returned by group number.
// - The atomic group emulation `(?:(?=(X))\N)` relies on lookaheads being
//   atomic. It becomes the native `(?>(X))`, which keeps the group and
//   its number.

use log::trace;

use crate::{
    error::Error,
    scanner::{
        capturing_openers, find_unescaped, get_group_contents, literal, match_group_reference,
        match_named_capturing_opener, replace_unescaped, ScanContext,
    },
};

const ATOMIC_EMULATION_OPENER: &str = "(?:(?=(";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub expression: String,

    // the name of each engine group, index 0 is the whole match
    pub group_names: Vec<Option<String>>,
}

pub fn lower(expression: &str) -> Result<Lowered, Error> {
    let mut group_names: Vec<Option<String>> = vec![None];
    group_names.extend(
        capturing_openers(expression)
            .into_iter()
            .map(|(_, opener)| opener.name.map(str::to_owned)),
    );

    let unnamed = remove_group_names(expression, &group_names)?;
    let lowered = lower_atomic_groups(&unnamed);
    trace!("lowered /{}/ to /{}/", expression, lowered);

    Ok(Lowered {
        expression: lowered,
        group_names,
    })
}

fn remove_group_names(expression: &str, group_names: &[Option<String>]) -> Result<String, Error> {
    if group_names.iter().all(Option::is_none) {
        return Ok(expression.to_owned());
    }

    replace_unescaped(
        expression,
        |input, position| {
            let rest = &input[position..];
            match_named_capturing_opener(rest)
                .map(|opener| opener.length)
                .or_else(|| match_group_reference(rest, "\\k<").map(|(length, _)| length))
        },
        |m| {
            let Some((_, name)) = match_group_reference(m, "\\k<") else {
                return Ok("(".to_owned());
            };

            // with duplicate names the first group wins
            group_names
                .iter()
                .position(|n| n.as_deref() == Some(name))
                .map(|number| format!("(?:\\{})", number))
                .ok_or_else(|| {
                    Error::SemanticIncorrect(format!(
                        "Backreference \"{}\" to an undefined group name",
                        m
                    ))
                })
        },
        Some(ScanContext::Default),
    )
}

fn lower_atomic_groups(expression: &str) -> String {
    let mut lowered = expression.to_owned();
    let mut position = 0;

    while let Some((start, length)) = find_unescaped(
        &lowered,
        literal(ATOMIC_EMULATION_OPENER),
        position,
        Some(ScanContext::Default),
    ) {
        position = start + 1;

        let opener = start + length - 1;
        let number = capturing_openers(&lowered)
            .iter()
            .take_while(|(s, _)| *s <= opener)
            .count();
        let contents = get_group_contents(&lowered, opener + 1);
        let contents_end = opener + 1 + contents.len();

        // the capture, the lookahead, the backreference, the group
        let tail = format!("))\\{})", number);
        if lowered[contents_end..].starts_with(&tail) {
            let replacement = format!("(?>({}))", contents);
            lowered.replace_range(start..contents_end + tail.len(), &replacement);
        }
    }

    lowered
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::Error;

    use super::{lower, Lowered};

    fn lower_expression(expression: &str) -> String {
        lower(expression).unwrap().expression
    }

    #[test]
    fn test_remove_group_names() {
        assert_eq!(
            lower("(?<a>x)(y)\\k<a>[(?<b>)\\k<b>]").unwrap(),
            Lowered {
                expression: "(x)(y)(?:\\1)[(?<b>)\\k<b>]".to_owned(),
                group_names: vec![None, Some("a".to_owned()), None],
            }
        );

        // followed by a digit
        assert_eq!(lower_expression("(?<a>x)\\k<a>1"), "(x)(?:\\1)1");

        // first of the duplicate names
        assert_eq!(lower_expression("(?<a>x)|(?<a>y)\\k<a>"), "(x)|(y)(?:\\1)");

        // escaped
        assert_eq!(lower_expression("(?<a>x)\\\\k<a>"), "(x)\\\\k<a>");

        // nothing to do
        assert_eq!(lower_expression("(x)\\1"), "(x)\\1");

        assert!(matches!(
            lower("(?<a>x)\\k<b>"),
            Err(Error::SemanticIncorrect(_))
        ));
    }

    #[test]
    fn test_lower_atomic_groups() {
        assert_eq!(lower_expression("a(?:(?=(bc|b))\\1)c"), "a(?>(bc|b))c");
        assert_eq!(
            lower_expression("(?<w>\\w+)(?:(?=(\\d+))\\2)"),
            "(\\w+)(?>(\\d+))"
        );

        // nested
        assert_eq!(
            lower_expression("(?:(?=((?:(?=(a))\\2)b))\\1)"),
            "(?>((?>(a))b))"
        );

        // a lookahead that is not an emulation
        assert_eq!(lower_expression("(?:(?=(a))\\2)(b)"), "(?:(?=(a))\\2)(b)");
        assert_eq!(lower_expression("(?:(?=(a))\\10)"), "(?:(?=(a))\\10)");
        assert_eq!(lower_expression("[(?:(?=(a))\\1)]"), "[(?:(?=(a))\\1)]");
    }
}
