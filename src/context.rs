// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// The context tracker answers one question: if an interpolated value were
// appended to a partial expression right now, where would it land?
//
// contexts outside a character class:
//
// - default              e.g. `a`
// - character class      e.g. `[a`
// - group name           e.g. `(?<`, `\k<`, `\g<`
// - enclosed token       e.g. `\p{`, `\u{`
// - interval quantifier  e.g. `a{`
// - invalid incomplete   e.g. `\`, `\c`, `\u12`, `\x1`
//
// contexts inside a character class:
//
// - default              e.g. `[a`
// - range                e.g. `[a-`
// - enclosed token       e.g. `[\p{`
// - q token              e.g. `[\q{`
// - invalid incomplete   e.g. `[\u1`
//
// The tokenizer below is also the one used by the whitespace and
// implicit-noncapture preprocessors, that is why it knows about
// complete escapes, group openers and double punctuators.

/// Characters that are reserved as double punctuators inside
/// Unicode-sets character classes, e.g. `&&`, `!!`.
pub const DOUBLE_PUNCTUATOR_CHARS: &str = "&!#$%*+,.:;<=>?@^`~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegexContext {
    #[default]
    Default,
    CharClass,
    GroupName,
    EnclosedToken,
    IntervalQuantifier,
    InvalidIncompleteToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharClassContext {
    #[default]
    Default,
    Range,
    EnclosedToken,
    QToken,
    InvalidIncompleteToken,
}

/// The running state of the tracker.
///
/// `char_class_depth > 0` iff `regex_context == RegexContext::CharClass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub regex_context: RegexContext,
    pub char_class_context: CharClassContext,
    pub char_class_depth: usize,

    // the byte offset where the next scan starts
    pub last_scanned_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // `(?<name`, `\k<name`, `\g<name`
    GroupNameOpener,
    // `\p{`, `\P{`, `\u{`
    EnclosedOpener,
    // `\q{`
    QOpener,
    // `{`
    IntervalOpener,
    // `\` at the end, `\c` without a letter, `\u` or `\x` with too few hex digits
    IncompleteEscape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: &'a str,
    pub start: usize,
}

/// Splits a partial expression into the tokens the tracker cares about.
pub struct TokenIter<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> TokenIter<'a> {
    pub fn new(text: &'a str, position: usize) -> Self {
        Self { text, position }
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.text.get(self.position..)?;
        if rest.is_empty() {
            return None;
        }

        let (kind, length) = lex_token(rest);
        let token = Token {
            kind,
            value: &rest[..length],
            start: self.position,
        };
        self.position += length;
        Some(token)
    }
}

fn count_hex_digits(s: &str, max: usize) -> usize {
    s.bytes()
        .take(max)
        .take_while(|b| b.is_ascii_hexdigit())
        .count()
}

fn first_char_length(s: &str) -> usize {
    s.chars().next().map_or(0, char::len_utf8)
}

fn lex_token(rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();

    if rest.starts_with("(?<") && !matches!(bytes.get(3), Some(b'=') | Some(b'!')) {
        return (TokenKind::GroupNameOpener, 3);
    }

    if rest.starts_with("\\k<") || rest.starts_with("\\g<") {
        return (TokenKind::GroupNameOpener, 3);
    }

    if rest.starts_with("\\p{") || rest.starts_with("\\P{") || rest.starts_with("\\u{") {
        return (TokenKind::EnclosedOpener, 3);
    }

    if rest.starts_with("\\q{") {
        return (TokenKind::QOpener, 3);
    }

    match bytes[0] {
        b'{' => (TokenKind::IntervalOpener, 1),
        b'\\' => lex_escape(rest),
        b'[' if rest.starts_with("[^") => (TokenKind::Other, 2),
        b'(' => match noncapturing_opener_length(rest) {
            Some(length) => (TokenKind::Other, length),
            None => (TokenKind::Other, 1),
        },
        b'-' if rest.starts_with("--") => (TokenKind::Other, 2),
        b if DOUBLE_PUNCTUATOR_CHARS.as_bytes().contains(&b) && bytes.get(1) == Some(&b) => {
            (TokenKind::Other, 2)
        }
        _ => (TokenKind::Other, first_char_length(rest)),
    }
}

fn lex_escape(rest: &str) -> (TokenKind, usize) {
    // \xxxx?  //
    // ^    ^__// to here
    // |_______// current char, validated

    let after = &rest[1..];
    match after.as_bytes().first() {
        None => (TokenKind::IncompleteEscape, 1),
        Some(b'c') => {
            if after.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic) {
                (TokenKind::Other, 3)
            } else {
                (TokenKind::IncompleteEscape, 2)
            }
        }
        Some(b'u') => {
            let count = count_hex_digits(&after[1..], 4);
            if count == 4 {
                (TokenKind::Other, 6)
            } else {
                (TokenKind::IncompleteEscape, 2 + count)
            }
        }
        Some(b'x') => {
            let count = count_hex_digits(&after[1..], 2);
            if count == 2 {
                (TokenKind::Other, 4)
            } else {
                (TokenKind::IncompleteEscape, 2 + count)
            }
        }
        Some(b'0') => {
            let digits = after[1..].bytes().take_while(u8::is_ascii_digit).count();
            // `\0` alone is a plain escape
            (TokenKind::Other, 2 + digits)
        }
        _ => (TokenKind::Other, 1 + first_char_length(after)),
    }
}

/// Length of a non-capturing group opener at the start of `rest`:
/// `(?:`, `(?=`, `(?!`, `(?>`, `(?<=`, `(?<!`, `(?(DEFINE)` and
/// modifier openers such as `(?i-ms:`.
pub fn noncapturing_opener_length(rest: &str) -> Option<usize> {
    if !rest.starts_with("(?") {
        return None;
    }

    let after = &rest[2..];
    match after.as_bytes().first() {
        Some(b':' | b'=' | b'!' | b'>') => Some(3),
        Some(b'<') if matches!(after.as_bytes().get(1), Some(b'=' | b'!')) => Some(4),
        Some(b'(') if after.starts_with("(DEFINE)") => Some(10),
        Some(b) if b.is_ascii_alphabetic() || *b == b'-' => {
            let count = after
                .bytes()
                .take_while(|b| b.is_ascii_alphabetic() || *b == b'-')
                .count();
            if after.as_bytes().get(count) == Some(&b':') {
                Some(2 + count + 1)
            } else {
                None
            }
        }
        _ => None,
    }
}

impl Context {
    /// Applies the transition of a single token.
    pub fn apply(&mut self, token: &Token) {
        let m = token.value;

        if m == "[" || m == "[^" {
            self.char_class_depth += 1;
            self.regex_context = RegexContext::CharClass;
            self.char_class_context = CharClassContext::Default;
        } else if m == "]" && self.regex_context == RegexContext::CharClass {
            self.char_class_depth = self.char_class_depth.saturating_sub(1);
            if self.char_class_depth == 0 {
                self.regex_context = RegexContext::Default;
            }
            // an unclosed `\q{` or `\p{` is left for the target engine to reject
            self.char_class_context = CharClassContext::Default;
        } else if self.regex_context == RegexContext::CharClass {
            self.char_class_context = match token.kind {
                TokenKind::IncompleteEscape => CharClassContext::InvalidIncompleteToken,
                TokenKind::EnclosedOpener => CharClassContext::EnclosedToken,
                TokenKind::QOpener => CharClassContext::QToken,
                _ if m == "-" => CharClassContext::Range,
                _ => match self.char_class_context {
                    CharClassContext::EnclosedToken | CharClassContext::QToken if m == "}" => {
                        CharClassContext::Default
                    }
                    CharClassContext::InvalidIncompleteToken | CharClassContext::Range => {
                        CharClassContext::Default
                    }
                    other => other,
                },
            };
        } else {
            self.regex_context = match token.kind {
                TokenKind::IncompleteEscape => RegexContext::InvalidIncompleteToken,
                TokenKind::GroupNameOpener => RegexContext::GroupName,
                TokenKind::EnclosedOpener => RegexContext::EnclosedToken,
                TokenKind::IntervalOpener => RegexContext::IntervalQuantifier,
                _ => match self.regex_context {
                    RegexContext::GroupName if m == ">" => RegexContext::Default,
                    RegexContext::EnclosedToken | RegexContext::IntervalQuantifier
                        if m == "}" =>
                    {
                        RegexContext::Default
                    }
                    RegexContext::InvalidIncompleteToken => RegexContext::Default,
                    other => other,
                },
            };
        }
    }
}

/// Scans `text` starting at `prior.last_scanned_offset` and returns the
/// context at the end of it.
///
/// Resuming from a prior state gives the same result as scanning the whole
/// text, as long as the prior scan ended on a token boundary.
pub fn advance(text: &str, prior: Context) -> Context {
    let mut context = prior;
    for token in TokenIter::new(text, prior.last_scanned_offset) {
        context.apply(&token);
    }
    context.last_scanned_offset = text.len();
    context
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        advance, noncapturing_opener_length, CharClassContext, Context, RegexContext, TokenIter,
        TokenKind,
    };

    fn end_context(text: &str) -> (RegexContext, CharClassContext, usize) {
        let context = advance(text, Context::default());
        (
            context.regex_context,
            context.char_class_context,
            context.char_class_depth,
        )
    }

    fn token_values(text: &str) -> Vec<&str> {
        TokenIter::new(text, 0).map(|t| t.value).collect()
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            token_values(r#"(?<n>a)\k<n>\p{L}[^\q{ab}]"#),
            vec![
                "(?<", "n", ">", "a", ")", "\\k<", "n", ">", "\\p{", "L", "}", "[^", "\\q{", "a",
                "b", "}", "]"
            ]
        );

        assert_eq!(
            token_values(r#"(?:(?=(?!(?>(?<=(?<!(?i-m:(?(DEFINE)"#),
            vec!["(?:", "(?=", "(?!", "(?>", "(?<=", "(?<!", "(?i-m:", "(?(DEFINE)"]
        );

        assert_eq!(
            token_values(r#"\cAA\u0041\x41\012\.&&--!!a"#),
            vec!["\\cA", "A", "\\u0041", "\\x41", "\\012", "\\.", "&&", "--", "!!", "a"]
        );

        // multibyte chars
        assert_eq!(token_values("文\\字"), vec!["文", "\\字"]);

        // incomplete escapes
        let kinds: Vec<TokenKind> = TokenIter::new(r#"\c"#, 0).map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::IncompleteEscape]);
        assert_eq!(token_values(r#"\u12g"#), vec!["\\u12", "g"]);
        assert_eq!(token_values(r#"\x1"#), vec!["\\x1"]);
        assert_eq!(token_values("\\"), vec!["\\"]);
    }

    #[test]
    fn test_noncapturing_opener_length() {
        assert_eq!(noncapturing_opener_length("(?:a)"), Some(3));
        assert_eq!(noncapturing_opener_length("(?<!a)"), Some(4));
        assert_eq!(noncapturing_opener_length("(?ims-i:a)"), Some(8));
        assert_eq!(noncapturing_opener_length("(?<a>)"), None);
        assert_eq!(noncapturing_opener_length("(?i)"), None);
        assert_eq!(noncapturing_opener_length("(a)"), None);
    }

    #[test]
    fn test_default_contexts() {
        assert_eq!(end_context(""), (RegexContext::Default, CharClassContext::Default, 0));
        assert_eq!(end_context("a(b)"), (RegexContext::Default, CharClassContext::Default, 0));

        assert_eq!(end_context("(?<").0, RegexContext::GroupName);
        assert_eq!(end_context("\\k<na").0, RegexContext::GroupName);
        assert_eq!(end_context("\\g<").0, RegexContext::GroupName);
        assert_eq!(end_context("(?<n>").0, RegexContext::Default);

        // lookbehind is not a group name
        assert_eq!(end_context("(?<=").0, RegexContext::Default);
        assert_eq!(end_context("(?<!").0, RegexContext::Default);

        assert_eq!(end_context("\\p{").0, RegexContext::EnclosedToken);
        assert_eq!(end_context("\\u{1").0, RegexContext::EnclosedToken);
        assert_eq!(end_context("\\p{L}").0, RegexContext::Default);

        assert_eq!(end_context("a{").0, RegexContext::IntervalQuantifier);
        assert_eq!(end_context("a{1,").0, RegexContext::IntervalQuantifier);
        assert_eq!(end_context("a{1,2}").0, RegexContext::Default);

        assert_eq!(end_context("\\").0, RegexContext::InvalidIncompleteToken);
        assert_eq!(end_context("\\c").0, RegexContext::InvalidIncompleteToken);
        assert_eq!(end_context("\\u12").0, RegexContext::InvalidIncompleteToken);
        assert_eq!(end_context("\\x").0, RegexContext::InvalidIncompleteToken);
        assert_eq!(end_context("\\x1a").0, RegexContext::Default);

        // advancing another token leaves the invalid context
        assert_eq!(end_context("\\c1").0, RegexContext::Default);
    }

    #[test]
    fn test_char_class_contexts() {
        assert_eq!(end_context("["), (RegexContext::CharClass, CharClassContext::Default, 1));
        assert_eq!(end_context("[^a"), (RegexContext::CharClass, CharClassContext::Default, 1));
        assert_eq!(end_context("[a[b"), (RegexContext::CharClass, CharClassContext::Default, 2));
        assert_eq!(end_context("[a[b]"), (RegexContext::CharClass, CharClassContext::Default, 1));
        assert_eq!(end_context("[a[b]]"), (RegexContext::Default, CharClassContext::Default, 0));

        assert_eq!(end_context("[a-").1, CharClassContext::Range);
        assert_eq!(end_context("[a-b").1, CharClassContext::Default);
        assert_eq!(end_context("[a--").1, CharClassContext::Default);

        assert_eq!(end_context("[\\p{").1, CharClassContext::EnclosedToken);
        assert_eq!(end_context("[\\p{L}").1, CharClassContext::Default);
        assert_eq!(end_context("[\\q{").1, CharClassContext::QToken);
        assert_eq!(end_context("[\\q{ab").1, CharClassContext::QToken);
        assert_eq!(end_context("[\\q{ab}").1, CharClassContext::Default);

        assert_eq!(end_context("[\\").1, CharClassContext::InvalidIncompleteToken);
        assert_eq!(end_context("[\\u1").1, CharClassContext::InvalidIncompleteToken);
        assert_eq!(end_context("[\\u1]").0, RegexContext::Default);

        // escaped brackets
        assert_eq!(end_context("[\\]").0, RegexContext::CharClass);
        assert_eq!(end_context("\\[").0, RegexContext::Default);

        // an unmatched `]` outside a class is a literal
        assert_eq!(end_context("]").0, RegexContext::Default);

        // group names and intervals are not recognized inside a class
        assert_eq!(end_context("[(?<").0, RegexContext::CharClass);
        assert_eq!(end_context("[a{").0, RegexContext::CharClass);
    }

    #[test]
    fn test_resume() {
        let whole = "(?<n>a)[b-\\q{c}]\\k<";
        let first = "(?<n>a)[b-";

        let prior = advance(first, Context::default());
        assert_eq!(prior.last_scanned_offset, first.len());
        assert_eq!(prior.char_class_context, CharClassContext::Range);

        let resumed = advance(whole, prior);
        assert_eq!(resumed, advance(whole, Context::default()));
        assert_eq!(resumed.regex_context, RegexContext::GroupName);
        assert_eq!(resumed.last_scanned_offset, whole.len());
    }
}
