// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{
    context::{CharClassContext, RegexContext, DOUBLE_PUNCTUATOR_CHARS},
    error::Error,
    scanner::{replace_unescaped, ScanContext},
};

const DEFAULT_META_CHARS: &str = "()[]{}|\\^$*+?.";
const CHAR_CLASS_META_CHARS: &str = "()[]{}|\\/-";

// Properties of strings, only valid in Unicode-sets mode, they may
// match more than one character.
const PROPERTIES_OF_STRINGS: [&str; 7] = [
    "Basic_Emoji",
    "Emoji_Keycap_Sequence",
    "RGI_Emoji_Modifier_Sequence",
    "RGI_Emoji_Flag_Sequence",
    "RGI_Emoji_Tag_Sequence",
    "RGI_Emoji_ZWJ_Sequence",
    "RGI_Emoji",
];

fn is_double_punctuator_char(c: char) -> bool {
    DOUBLE_PUNCTUATOR_CHARS.contains(c)
}

/// Escapes the text so that it matches literally in the given context.
///
/// Inside a character class all double punctuator characters are escaped,
/// since the characters around the interpolated text could double them.
pub fn escape_for_context(text: &str, context: ScanContext) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        let special = match context {
            ScanContext::Default => DEFAULT_META_CHARS.contains(c),
            ScanContext::CharClass => {
                CHAR_CLASS_META_CHARS.contains(c) || is_double_punctuator_char(c)
            }
        };
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes a leading double punctuator character that is not doubled.
///
/// Unless the character is the whole text, an unescaped copy follows it,
/// so that a doubling with the next character is still rejected by the
/// target engine, e.g. `&a` -> `\&&a`.
pub fn sandbox_lone_double_punctuator_char(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_double_punctuator_char(first) => {
            let rest = chars.as_str();
            if rest.starts_with(first) {
                return text.to_owned();
            }

            if rest.is_empty() {
                format!("\\{}", first)
            } else {
                format!("\\{}{}{}", first, first, rest)
            }
        }
        _ => text.to_owned(),
    }
}

/// A leading `^` would negate the enclosing class.
pub fn sandbox_lone_char_class_caret(text: &str) -> String {
    match text.strip_prefix('^') {
        Some(rest) => format!("\\^^{}", rest),
        None => text.to_owned(),
    }
}

/// Rewrites `\0` (not followed by a digit) as `\u{0}`, so that a digit
/// following it from outside cannot turn it into another escape.
pub fn sandbox_unsafe_nulls(text: &str, context: Option<ScanContext>) -> Result<String, Error> {
    replace_unescaped(
        text,
        |input, position| {
            let rest = &input[position..];
            (rest.starts_with("\\0") && !rest[2..].starts_with(|c: char| c.is_ascii_digit()))
                .then_some(2)
        },
        |_| Ok("\\u{0}".to_owned()),
        context,
    )
}

/// Removes every `\` and the character following it, a trailing `\`
/// is kept.
fn remove_escapes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(_) => {}
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Finds a character that would change the meaning of the tokens
/// following the interpolated value.
pub fn get_breakout_char(
    text: &str,
    regex_context: RegexContext,
    char_class_context: CharClassContext,
) -> Option<char> {
    let unescaped = remove_escapes(text);

    if unescaped.ends_with('\\') {
        return Some('\\');
    }

    let in_enclosed_class_token = matches!(
        char_class_context,
        CharClassContext::EnclosedToken | CharClassContext::QToken
    );

    if regex_context == RegexContext::Default {
        // a `)` that is not closing a group of the same text
        let mut groups_open: isize = 0;
        let mut class_depth = 0usize;
        for c in unescaped.chars() {
            match c {
                '[' => class_depth += 1,
                ']' if class_depth > 0 => class_depth -= 1,
                '(' if class_depth == 0 => groups_open += 1,
                ')' if class_depth == 0 => {
                    groups_open -= 1;
                    if groups_open < 0 {
                        return Some(')');
                    }
                }
                _ => {}
            }
        }
        None
    } else if regex_context == RegexContext::CharClass && !in_enclosed_class_token {
        // a `]` that is not closing a nested class of the same text
        let mut open: isize = 0;
        for c in unescaped.chars() {
            match c {
                '[' => open += 1,
                ']' => {
                    open -= 1;
                    if open < 0 {
                        return Some(']');
                    }
                }
                _ => {}
            }
        }
        None
    } else if matches!(
        regex_context,
        RegexContext::EnclosedToken | RegexContext::IntervalQuantifier
    ) || in_enclosed_class_token
    {
        unescaped.contains('}').then_some('}')
    } else if regex_context == RegexContext::GroupName {
        unescaped.contains('>').then_some('>')
    } else {
        None
    }
}

// A token in a class, as far as union detection is concerned.
#[derive(PartialEq)]
enum ClassToken<'a> {
    PropertyOfStrings,
    QEscape,
    Operator(&'a str),
    Bracket(char),
    Single(&'a str),
}

fn next_class_token(rest: &str) -> (ClassToken<'_>, usize) {
    if rest.starts_with("--") || rest.starts_with("&&") {
        return (ClassToken::Operator(&rest[..2]), 2);
    }

    let Some(after) = rest.strip_prefix('\\') else {
        let c = rest.chars().next().unwrap_or('\0');
        let length = c.len_utf8();
        return match c {
            '[' | ']' => (ClassToken::Bracket(c), length),
            '-' => (ClassToken::Operator(&rest[..length]), length),
            _ => (ClassToken::Single(&rest[..length]), length),
        };
    };

    let bytes = after.as_bytes();
    let length = match bytes.first() {
        Some(b'c') if bytes.get(1).is_some_and(u8::is_ascii_alphabetic) => 3,
        Some(b'p') | Some(b'P') if bytes.get(1) == Some(&b'{') => {
            match after[2..].find('}') {
                Some(end) if end > 0 => {
                    let name = &after[2..2 + end];
                    if bytes[0] == b'p' && PROPERTIES_OF_STRINGS.contains(&name) {
                        return (ClassToken::PropertyOfStrings, 0);
                    }
                    1 + 2 + end + 1
                }
                _ => 2,
            }
        }
        Some(b'q') => return (ClassToken::QEscape, 0),
        Some(b'u') => {
            let hex4 = after[1..]
                .bytes()
                .take(4)
                .take_while(u8::is_ascii_hexdigit)
                .count();
            if hex4 == 4 {
                6
            } else if after[1..].starts_with('{') {
                let digits = after[2..].bytes().take_while(u8::is_ascii_hexdigit).count();
                if digits > 0 && after[2 + digits..].starts_with('}') {
                    1 + 2 + digits + 1
                } else {
                    2
                }
            } else {
                2
            }
        }
        Some(b'x')
            if after[1..]
                .bytes()
                .take(2)
                .take_while(u8::is_ascii_hexdigit)
                .count()
                == 2 =>
        {
            4
        }
        Some(_) => 1 + after.chars().next().map_or(0, char::len_utf8),
        None => 1,
    };

    (ClassToken::Single(&rest[..length]), length)
}

/// Whether a class fragment contains more than one unit, i.e. it would
/// need to be wrapped in a nested class before it can be placed next to
/// other class contents, e.g. as the end of a range or an operand.
///
/// A range (`a-z`) or a set operation (`a--b`, `a&&b`) joins its operands
/// into one unit.
pub fn contains_char_class_union(fragment: &str) -> bool {
    let mut has_first = false;
    let mut last_was_close = false;
    let mut position = 0;

    while position < fragment.len() {
        let (token, length) = next_class_token(&fragment[position..]);
        match token {
            ClassToken::PropertyOfStrings | ClassToken::QEscape => return true,
            ClassToken::Bracket('[') => {
                if has_first {
                    return true;
                }
                last_was_close = false;
            }
            ClassToken::Bracket(_) => {
                last_was_close = true;
            }
            ClassToken::Operator(_) => {
                has_first = false;
                last_was_close = false;
            }
            ClassToken::Single(_) => {
                if has_first || last_was_close {
                    return true;
                }
                has_first = true;
                last_was_close = false;
            }
        }
        position += length;
    }

    false
}
