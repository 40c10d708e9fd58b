// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Implicit flag `x`.
//
// Outside character classes, whitespace and `#` comments (up to a line
// feed) are removed. Inside character classes only space and tab are
// removed. To keep the tokens on either side of removed whitespace apart,
// a separator `(?:)` is emitted before the next token, e.g.
// `\1 0` -> `\1(?:)0`, unless that token is a quantifier which must
// attach to the previous token, e.g. `a +` -> `a+`.
//
// Whitespace inside group names, enclosed tokens and interval quantifiers
// is kept so that the target engine rejects it.

use crate::{
    context::{CharClassContext, Context, RegexContext, TokenIter},
    error::Error,
    escape::{sandbox_lone_double_punctuator_char, sandbox_unsafe_nulls},
};

use super::Preprocessed;

pub const SEPARATOR: &str = "(?:)";

fn is_whitespace(m: &str) -> bool {
    let mut chars = m.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_whitespace() || c == '\u{feff}',
        _ => false,
    }
}

fn is_char_class_whitespace(m: &str) -> bool {
    m == " " || m == "\t"
}

fn is_escaped(m: &str, predicate: fn(&str) -> bool) -> bool {
    match m.strip_prefix('\\') {
        Some(rest) => predicate(rest),
        None => false,
    }
}

fn is_quantifier(m: &str) -> bool {
    matches!(m, "?" | "*" | "+" | "??" | "**" | "++")
}

struct Output {
    transformed: String,
    separator_needed: bool,
}

impl Output {
    fn emit(&mut self, s: &str) {
        self.emit_with(s, false, "");
    }

    fn emit_with(&mut self, s: &str, no_prefix: bool, postfix: &str) {
        if self.separator_needed && !no_prefix {
            self.transformed.push_str(SEPARATOR);
        }
        self.transformed.push_str(s);
        self.transformed.push_str(postfix);
        self.separator_needed = false;
    }
}

pub fn remove_whitespace(segment: &str, context: Context) -> Result<Preprocessed, Error> {
    let mut context = context;
    let mut output = Output {
        transformed: String::with_capacity(segment.len()),
        separator_needed: false,
    };

    let mut ignoring_whitespace = false;
    let mut ignoring_char_class_whitespace = false;
    let mut ignoring_comment = false;
    let mut last_significant_char_class_context: Option<CharClassContext> = None;

    for token in TokenIter::new(segment, 0) {
        let m = token.value;

        if ignoring_comment {
            if m == "\n" {
                ignoring_comment = false;
                output.separator_needed = true;
            }
            continue;
        }

        if ignoring_whitespace {
            if is_whitespace(m) {
                continue;
            }
            ignoring_whitespace = false;
            output.separator_needed = true;
        } else if ignoring_char_class_whitespace {
            if is_char_class_whitespace(m) {
                continue;
            }
            ignoring_char_class_whitespace = false;
        }

        context.apply(&token);
        let regex_context = context.regex_context;
        let char_class_context = context.char_class_context;

        if m == "-"
            && regex_context == RegexContext::CharClass
            && last_significant_char_class_context == Some(CharClassContext::Range)
        {
            // with the whitespace gone, the hyphen would join the previous
            // one into a subtraction operator
            return Err(Error::SyntaxIncorrect(
                "Invalid unescaped hyphen as the end value for a range".to_owned(),
            ));
        }

        if (regex_context == RegexContext::Default && is_quantifier(m))
            || (regex_context == RegexContext::IntervalQuantifier && m == "{")
        {
            // a lone `?` is followed by a separator, otherwise `( ?:)`
            // would become the group opener `(?:`
            let postfix = if m == "?" { SEPARATOR } else { "" };
            output.emit_with(m, true, postfix);
        } else if regex_context == RegexContext::Default {
            if is_whitespace(m) {
                ignoring_whitespace = true;
            } else if m.starts_with('#') {
                ignoring_comment = true;
            } else if is_escaped(m, |c| is_whitespace(c) || c == "#") {
                output.emit_with(&m[1..], true, "");
            } else {
                output.emit(m);
            }
        } else if regex_context == RegexContext::CharClass && m != "[" && m != "[^" {
            if is_char_class_whitespace(m)
                && matches!(
                    char_class_context,
                    CharClassContext::Default | CharClassContext::Range | CharClassContext::QToken
                )
            {
                ignoring_char_class_whitespace = true;
            } else if char_class_context == CharClassContext::InvalidIncompleteToken {
                // the removed whitespace after it could complete the token
                return Err(Error::SyntaxIncorrect(format!(
                    "Invalid incomplete token in character class: \"{}\"",
                    m
                )));
            } else if is_escaped(m, is_char_class_whitespace)
                && matches!(
                    char_class_context,
                    CharClassContext::Default | CharClassContext::QToken
                )
            {
                output.emit_with(&m[1..], true, "");
            } else if char_class_context == CharClassContext::Default {
                let sandboxed = sandbox_lone_double_punctuator_char(&sandbox_unsafe_nulls(m, None)?);
                output.emit(&sandboxed);
            } else {
                output.emit(m);
            }
        } else {
            output.emit(m);
        }

        if !(ignoring_whitespace || ignoring_char_class_whitespace || ignoring_comment) {
            last_significant_char_class_context = Some(char_class_context);
        }
    }

    context.last_scanned_offset = segment.len();

    Ok(Preprocessed {
        transformed: output.transformed,
        context,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        context::{Context, RegexContext},
        error::Error,
    };

    use super::remove_whitespace;

    fn transform(s: &str) -> Result<String, Error> {
        remove_whitespace(s, Context::default()).map(|p| p.transformed)
    }

    #[test]
    fn test_remove_whitespace() {
        assert_eq!(transform("a b").unwrap(), "a(?:)b");
        assert_eq!(transform(" a ").unwrap(), "(?:)a");
        assert_eq!(transform("\t\n a \u{feff}\u{2003} b").unwrap(), "(?:)a(?:)b");

        assert_eq!(
            transform(" ^ (?! a \\s b . c | d [] e ) $ ").unwrap(),
            "(?:)^(?:)(?!(?:)a(?:)\\s(?:)b(?:).(?:)c(?:)|(?:)d(?:)[](?:)e(?:))(?:)$"
        );

        // escaped whitespace and hash
        assert_eq!(transform("a\\ b\\#").unwrap(), "a b#");
        assert_eq!(transform("\\\t").unwrap(), "\t");
    }

    #[test]
    fn test_remove_comments() {
        assert_eq!(transform("a# comment\nb").unwrap(), "a(?:)b");
        assert_eq!(transform("a # (unclosed [\nb").unwrap(), "a(?:)b");
        assert_eq!(transform("a #").unwrap(), "a");
        assert_eq!(transform("a[#]").unwrap(), "a[\\#]");
    }

    #[test]
    fn test_attach_quantifiers() {
        assert_eq!(transform("a +").unwrap(), "a+");
        assert_eq!(transform("a *").unwrap(), "a*");
        assert_eq!(transform("a ?").unwrap(), "a?(?:)");
        assert_eq!(transform("a + ?").unwrap(), "a+?(?:)");
        assert_eq!(transform("a ??").unwrap(), "a??");
        assert_eq!(transform("a {2}").unwrap(), "a{2}");
        assert_eq!(transform("a {1,2} b").unwrap(), "a{1,2}(?:)b");

        // a `?` cannot become a group type marker
        assert_eq!(transform("( ?:)").unwrap(), "(?(?:):)");

        // a separator keeps escapes apart
        assert_eq!(transform("\\1 0").unwrap(), "\\1(?:)0");
    }

    #[test]
    fn test_keep_whitespace_in_tokens() {
        assert_eq!(transform("\\k< n >").unwrap(), "\\k< n >");
        assert_eq!(transform("\\p{ L }").unwrap(), "\\p{ L }");
        assert_eq!(transform("a{1, 2}").unwrap(), "a{1, 2}");
    }

    #[test]
    fn test_char_class() {
        assert_eq!(transform("[ a - z ]").unwrap(), "[a-z]");
        assert_eq!(transform("[\\ a\\\t]").unwrap(), "[ a\t]");
        assert_eq!(transform("[\\q{ a b }]").unwrap(), "[\\q{ab}]");

        // only space and tab
        assert_eq!(transform("[a\nb]").unwrap(), "[a\nb]");

        // sandboxing
        assert_eq!(transform("[a & & b]").unwrap(), "[a\\&\\&b]");
        assert_eq!(transform("[&&]").unwrap(), "[&&]");
        assert_eq!(transform("[\\0 1]").unwrap(), "[\\u{0}1]");

        assert!(matches!(
            transform("[a - - z]"),
            Err(Error::SyntaxIncorrect(_))
        ));
        assert!(matches!(transform("[\\u 0041]"), Err(Error::SyntaxIncorrect(_))));
    }

    #[test]
    fn test_end_context() {
        let result = remove_whitespace("[ a", Context::default()).unwrap();
        assert_eq!(result.context.regex_context, RegexContext::CharClass);
        assert_eq!(result.context.last_scanned_offset, 3);
    }
}
