// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use log::trace;

use crate::{context::noncapturing_opener_length, error::Error, scanner::match_named_capturing_opener};

#[derive(Debug, PartialEq)]
enum BaseToken {
    // a group opener, `true` for lookaround
    GroupOpener(bool),
    Quantifier {
        // length of the quantifier without the suffixes
        length: usize,
        modifier: Option<char>,
        // another quantifier char after the modifier
        invalid: bool,
    },
    Other,
}

fn lex_base_token(rest: &str) -> (BaseToken, usize) {
    let bytes = rest.as_bytes();

    match bytes[0] {
        b'\\' => (BaseToken::Other, lex_escape(rest)),
        b'(' => {
            if let Some(length) = noncapturing_opener_length(rest) {
                let lookaround = matches!(&rest[..length], "(?=" | "(?!" | "(?<=" | "(?<!");
                (BaseToken::GroupOpener(lookaround), length)
            } else {
                let length = match_named_capturing_opener(rest).map_or(1, |o| o.length);
                (BaseToken::GroupOpener(false), length)
            }
        }
        b'?' | b'*' | b'+' => lex_quantifier_suffixes(rest, 1),
        b'{' => match interval_length(rest) {
            Some(length) => lex_quantifier_suffixes(rest, length),
            None => (BaseToken::Other, 1),
        },
        _ => (
            BaseToken::Other,
            rest.chars().next().map_or(1, char::len_utf8),
        ),
    }
}

// `{n}`, `{n,}` or `{n,m}`
fn interval_length(rest: &str) -> Option<usize> {
    let after = &rest[1..];
    let min = after.bytes().take_while(u8::is_ascii_digit).count();
    if min == 0 {
        return None;
    }

    let mut length = 1 + min;
    if rest[length..].starts_with(',') {
        length += 1;
        length += rest[length..].bytes().take_while(u8::is_ascii_digit).count();
    }

    rest[length..].starts_with('}').then_some(length + 1)
}

fn lex_quantifier_suffixes(rest: &str, length: usize) -> (BaseToken, usize) {
    let bytes = rest.as_bytes();
    let mut total = length;

    let modifier = match bytes.get(total) {
        Some(b'?') => Some('?'),
        Some(b'+') => Some('+'),
        _ => None,
    };
    if modifier.is_some() {
        total += 1;
    }

    let invalid = matches!(bytes.get(total), Some(b'?' | b'*' | b'+' | b'{'));
    if invalid {
        total += 1;
    }

    (
        BaseToken::Quantifier {
            length,
            modifier,
            invalid,
        },
        total,
    )
}

fn count_hex_digits(s: &str, max: usize) -> usize {
    s.bytes()
        .take(max)
        .take_while(u8::is_ascii_hexdigit)
        .count()
}

// complete multi-character escapes, so that e.g. the `}` of `\p{L}` or the
// digits of `\12` are never seen alone
fn lex_escape(rest: &str) -> usize {
    let after = &rest[1..];
    let bytes = after.as_bytes();

    let simple = || 1 + after.chars().next().map_or(0, char::len_utf8);

    match bytes.first() {
        None => 1,
        Some(b) if b.is_ascii_digit() => 1 + after.bytes().take_while(u8::is_ascii_digit).count(),
        Some(b'c') if bytes.get(1).is_some_and(u8::is_ascii_alphabetic) => 3,
        Some(b'g' | b'k') if bytes.get(1) == Some(&b'<') => match after[2..].find('>') {
            Some(end) if end > 0 => 1 + 2 + end + 1,
            _ => simple(),
        },
        Some(b'p' | b'P' | b'u') if bytes.get(1) == Some(&b'{') => match after[2..].find('}') {
            Some(end) if end > 0 => 1 + 2 + end + 1,
            _ => simple(),
        },
        Some(b'u') if count_hex_digits(&after[1..], 4) == 4 => 6,
        Some(b'x') if count_hex_digits(&after[1..], 2) == 2 => 4,
        _ => simple(),
    }
}

#[derive(Debug, Clone, Copy)]
struct Group {
    // position in the output
    start: usize,
    lookaround: bool,
}

/// Rewrites possessive quantifiers `?+`, `*+`, `++`, `{n,}+` and `{n,m}+`
/// as atomic groups, e.g. `a++` -> `(?>a+)`.
///
/// The quantified node is the preceding token, group or (outermost)
/// character class. Since a fixed repetition never backtracks, `{n}+`
/// becomes `{n}`.
pub fn possessive(expression: &str) -> Result<String, Error> {
    let mut transformed = String::with_capacity(expression.len());

    let mut open_groups: Vec<Group> = vec![];
    let mut last_group: Option<Group> = None;
    let mut last_class_start: Option<usize> = None;
    let mut class_depth = 0usize;

    // the last token and its position in the output
    let mut last_token: Option<(&str, usize)> = None;

    let mut position = 0;
    while position < expression.len() {
        let rest = &expression[position..];
        let (token, length) = lex_base_token(rest);
        let m = &rest[..length];
        position += length;

        if m == "[" {
            if class_depth == 0 {
                last_class_start = Some(transformed.len());
            }
            class_depth += 1;
        } else if m == "]" {
            if class_depth > 0 {
                class_depth -= 1;
            } else {
                // unmatched, a literal
                last_class_start = None;
            }
        } else if class_depth == 0 {
            match token {
                BaseToken::Quantifier {
                    length: quantifier_length,
                    modifier: Some('+'),
                    invalid,
                } => {
                    let quantifier = &m[..quantifier_length];
                    let start = check_target(last_token, last_group, last_class_start, m)?;

                    // the wrapping group would make a following quantifier valid
                    if invalid {
                        return Err(Error::SyntaxIncorrect(format!(
                            "Invalid quantifier \"{}\"",
                            m
                        )));
                    }

                    if !quantifier.contains(',') && quantifier.starts_with('{') {
                        transformed.push_str(quantifier);
                    } else {
                        let node = transformed.split_off(start);
                        trace!("possessive {}{}+", node, quantifier);
                        transformed.push_str("(?>");
                        transformed.push_str(&node);
                        transformed.push_str(quantifier);
                        transformed.push(')');

                        let group = Group {
                            start,
                            lookaround: false,
                        };
                        last_group = Some(group);
                        last_token = Some((")", transformed.len() - 1));
                    }
                    continue;
                }
                BaseToken::GroupOpener(lookaround) => {
                    open_groups.push(Group {
                        start: transformed.len(),
                        lookaround,
                    });
                }
                _ if m == ")" => {
                    last_group = open_groups.pop();
                }
                _ => {}
            }
        }

        last_token = Some((m, transformed.len()));
        transformed.push_str(m);
    }

    Ok(transformed)
}

// returns the start of the node to be wrapped
fn check_target(
    last_token: Option<(&str, usize)>,
    last_group: Option<Group>,
    last_class_start: Option<usize>,
    m: &str,
) -> Result<usize, Error> {
    let nothing_to_repeat = || {
        Error::SyntaxIncorrect(format!(
            "Nothing to repeat before possessive quantifier \"{}\"",
            m
        ))
    };

    let Some((token, token_start)) = last_token else {
        return Err(nothing_to_repeat());
    };

    if token.starts_with('(') || matches!(token, "|" | "^" | "$" | "\\b" | "\\B") {
        return Err(nothing_to_repeat());
    }

    match token {
        ")" => match last_group {
            Some(group) if group.lookaround => Err(nothing_to_repeat()),
            Some(group) => Ok(group.start),
            None => Err(Error::SyntaxIncorrect("Invalid unmatched \")\"".to_owned())),
        },
        "]" => last_class_start
            .ok_or_else(|| Error::SyntaxIncorrect("Invalid unmatched \"]\"".to_owned())),
        _ => Ok(token_start),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::Error;

    use super::possessive;

    #[test]
    fn test_possessive() {
        assert_eq!(possessive("a++").unwrap(), "(?>a+)");
        assert_eq!(possessive("a*+b").unwrap(), "(?>a*)b");
        assert_eq!(possessive("ab?+").unwrap(), "a(?>b?)");
        assert_eq!(possessive("a{2,}+").unwrap(), "(?>a{2,})");
        assert_eq!(possessive("a{2,3}+").unwrap(), "(?>a{2,3})");

        // fixed repetition
        assert_eq!(possessive("a{2}+").unwrap(), "a{2}");

        // multi-character tokens
        assert_eq!(possessive("\\d++").unwrap(), "(?>\\d+)");
        assert_eq!(possessive("\\u0041*+").unwrap(), "(?>\\u0041*)");
        assert_eq!(possessive("\\p{L}++").unwrap(), "(?>\\p{L}+)");
        assert_eq!(possessive("(a)\\1++").unwrap(), "(a)(?>\\1+)");
        assert_eq!(
            possessive("(?<n>a)\\k<n>++").unwrap(),
            "(?<n>a)(?>\\k<n>+)"
        );
        assert_eq!(possessive("文++").unwrap(), "(?>文+)");
    }

    #[test]
    fn test_possessive_groups_and_classes() {
        assert_eq!(possessive("(ab)++").unwrap(), "(?>(ab)+)");
        assert_eq!(possessive("x(?:a(b))*+c").unwrap(), "x(?>(?:a(b))*)c");
        assert_eq!(possessive("(?<n>a)?+").unwrap(), "(?>(?<n>a)?)");
        assert_eq!(possessive("[a-z]++").unwrap(), "(?>[a-z]+)");
        assert_eq!(possessive("[[a]b]++").unwrap(), "(?>[[a]b]+)");
        assert_eq!(possessive("(a++)++").unwrap(), "(?>((?>a+))+)");
        assert_eq!(possessive("a(b)[c]++").unwrap(), "a(b)(?>[c]+)");
    }

    #[test]
    fn test_not_possessive() {
        assert_eq!(possessive("a+").unwrap(), "a+");
        assert_eq!(possessive("a+?").unwrap(), "a+?");
        assert_eq!(possessive("a\\++").unwrap(), "a\\++");
        assert_eq!(possessive("[a++]").unwrap(), "[a++]");
        assert_eq!(possessive("a{,2}+").unwrap(), "a{,2}+");
    }

    #[test]
    fn test_invalid_possessive() {
        for expression in ["++", "(++)", "a|++", "^++", "$*+", "\\b++", "(?=a)++", "(?<!a)?+"] {
            assert!(
                matches!(possessive(expression), Err(Error::SyntaxIncorrect(_))),
                "{}",
                expression
            );
        }

        // a following quantifier
        assert!(matches!(possessive("a+++"), Err(Error::SyntaxIncorrect(_))));
        assert!(matches!(possessive("a*+{2}"), Err(Error::SyntaxIncorrect(_))));

        // unmatched
        assert!(matches!(possessive("a)++"), Err(Error::SyntaxIncorrect(_))));
        assert!(matches!(possessive("]++"), Err(Error::SyntaxIncorrect(_))));
    }
}
