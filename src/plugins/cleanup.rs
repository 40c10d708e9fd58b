// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    context::noncapturing_opener_length,
    error::Error,
    preprocess::whitespace::SEPARATOR,
    scanner::{escaped_token_length, EMULATION_MARKER},
};

// escapes that can not be extended by a following character
const COMPLETE_ESCAPE_CHARS: &str = "bBdDfnrsStvwW";

fn is_followed_by_boundary(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }

    if rest.starts_with('(') {
        return !rest[1..].starts_with("DEFINE");
    }

    rest.starts_with([')', '|', '.', '[', '$', '\\'])
}

fn is_boundary_token(token: Option<&str>) -> bool {
    let Some(token) = token else {
        // the start of the expression
        return true;
    };

    match token {
        "(" | ")" | "|" | "." | "]" | "^" => true,
        // the end of a group name
        _ if token.ends_with('>') && !token.starts_with('\\') => true,
        _ if token.len() == 2 && token.starts_with('\\') => {
            COMPLETE_ESCAPE_CHARS.contains(&token[1..])
        }
        _ => noncapturing_opener_length(token) == Some(token.len()),
    }
}

fn is_followed_by_quantifier(rest: &str) -> bool {
    rest.starts_with(['?', '*', '+', '{'])
}

/// Removes the separators `(?:)` inserted by the free-spacing preprocessor
/// where they can not change the meaning of the tokens around them.
///
/// A run of separators collapses to one. Character classes are skipped.
pub fn cleanup(expression: &str) -> Result<String, Error> {
    let mut transformed = String::with_capacity(expression.len());
    let mut last_token: Option<&str> = None;
    let mut class_depth = 0usize;
    let mut position = 0;

    while position < expression.len() {
        let rest = &expression[position..];

        if class_depth == 0 && rest.starts_with(SEPARATOR) {
            position += SEPARATOR.len();
            while expression[position..].starts_with(SEPARATOR) {
                position += SEPARATOR.len();
            }

            let rest = &expression[position..];

            // `(` followed by a marker would become a synthetic group
            let removable = !rest.starts_with(EMULATION_MARKER)
                && (is_followed_by_boundary(rest)
                    || (is_boundary_token(last_token) && !is_followed_by_quantifier(rest)));

            if !removable {
                transformed.push_str(SEPARATOR);
                last_token = Some(SEPARATOR);
            }
            continue;
        }

        let length = if class_depth == 0 {
            noncapturing_opener_length(rest).unwrap_or_else(|| escaped_token_length(rest, 0))
        } else {
            escaped_token_length(rest, 0)
        };
        let m = &rest[..length];

        match m {
            "[" => class_depth += 1,
            "]" if class_depth > 0 => class_depth -= 1,
            _ => {}
        }

        transformed.push_str(m);
        last_token = Some(m);
        position += length;
    }

    Ok(transformed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::cleanup;

    #[test]
    fn test_remove_separators() {
        assert_eq!(cleanup("(?:)a").unwrap(), "a");
        assert_eq!(cleanup("a(?:)").unwrap(), "a");
        assert_eq!(cleanup("a(?:)|(?:)b").unwrap(), "a|b");
        assert_eq!(cleanup("(a)(?:)b").unwrap(), "(a)b");
        assert_eq!(cleanup("a(?:)(b)").unwrap(), "a(b)");
        assert_eq!(cleanup("\\d(?:)0").unwrap(), "\\d0");
        assert_eq!(cleanup("(?<n>(?:)a)").unwrap(), "(?<n>a)");
        assert_eq!(cleanup("(?=(?:)a)").unwrap(), "(?=a)");
        assert_eq!(cleanup("a(?:)\\d").unwrap(), "a\\d");

        // collapsed
        assert_eq!(cleanup("a(?:)(?:)(?:)b").unwrap(), "a(?:)b");
        assert_eq!(cleanup("a(?:)(?:)(?:)").unwrap(), "a");
    }

    #[test]
    fn test_keep_separators() {
        // the tokens would merge
        assert_eq!(cleanup("\\1(?:)0").unwrap(), "\\1(?:)0");
        assert_eq!(cleanup("\\u(?:)0041").unwrap(), "\\u(?:)0041");
        assert_eq!(cleanup("a(?:)b").unwrap(), "a(?:)b");

        // the quantifier would apply to the preceding token
        assert_eq!(cleanup("(?:)+").unwrap(), "(?:)+");
        assert_eq!(cleanup("((?:)?:)").unwrap(), "((?:)?:)");
        assert_eq!(cleanup("a|(?:){2}").unwrap(), "a|(?:){2}");

        // a marker would become a synthetic group
        assert_eq!(cleanup("((?:)$E$a)").unwrap(), "((?:)$E$a)");

        // in a class it is not a separator
        assert_eq!(cleanup("[(?:)]").unwrap(), "[(?:)]");
    }
}
