// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// Assembles the expression from the raw segments and the substitutions.
//
// Every substitution is inserted according to the context it lands in,
// so that it is atomic: it cannot change the meaning of the tokens around
// it, and the tokens around it cannot change its meaning. e.g.
//
// - `a${"b.c"}*` -> `a(?:b\.c)*`
// - `[${"a-z"}]` -> `[[a\-z]]`
// - `(?<${"name"}>.)` -> `(?<name>.)`

use log::trace;

use crate::{
    context::{advance, CharClassContext, Context, RegexContext},
    error::Error,
    escape::{
        contains_char_class_union, escape_for_context, get_breakout_char,
        sandbox_lone_char_class_caret, sandbox_lone_double_punctuator_char, sandbox_unsafe_nulls,
    },
    options::{Capabilities, Flags},
    pattern::{Subexpression, Substitution},
    scanner::{
        adjust_numbered_backreferences, count_captures, find_unescaped, literal,
        replace_unescaped, ScanContext,
    },
};

const NEWLINE_CHARS: &str = "\\n\\r\\u2028\\u2029";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub expression: String,

    // the number of capturing groups, named and unnamed
    pub capture_count: usize,
}

/// Joins the segments and the substitutions.
///
/// `flags` are the user flags of the enclosing expression, they decide
/// how the flags of interpolated subexpressions are reconciled.
pub fn interpolate_template(
    segments: &[String],
    substitutions: &[Substitution],
    flags: Flags,
    capabilities: &Capabilities,
) -> Result<Assembled, Error> {
    let mut expression = String::new();
    let mut capture_count = 0;
    let mut context = Context::default();

    for (idx, segment) in segments.iter().enumerate() {
        capture_count += count_captures(segment);

        // outside classes a following value is always wrapped, so only
        // the `\0` inside classes needs sandboxing
        expression.push_str(&sandbox_unsafe_nulls(segment, Some(ScanContext::CharClass))?);
        context = advance(&expression, context);

        let Some(substitution) = substitutions.get(idx) else {
            continue;
        };

        let wrap_escaped_text =
            !segment.is_empty() || segments.get(idx + 1).is_some_and(|s| !s.is_empty());

        let value = interpolate(
            substitution,
            flags,
            capabilities,
            &context,
            wrap_escaped_text,
            capture_count,
        )?;
        trace!("interpolated {:?} as {:?}", substitution, value);
        expression.push_str(&value);

        capture_count += match substitution {
            Substitution::Text(_) => 0,
            Substitution::Pattern(pattern) => count_captures(pattern.as_str()),
            Substitution::Subexpression(subexpression) => count_captures(subexpression.source()),
        };
    }

    Ok(Assembled {
        expression,
        capture_count,
    })
}

fn interpolate(
    substitution: &Substitution,
    flags: Flags,
    capabilities: &Capabilities,
    context: &Context,
    wrap_escaped_text: bool,
    preceding_captures: usize,
) -> Result<String, Error> {
    let regex_context = context.regex_context;
    let char_class_context = context.char_class_context;

    if let Substitution::Subexpression(_) = substitution {
        if regex_context != RegexContext::Default {
            return Err(Error::InterpolationRejected(
                "Cannot interpolate a subexpression at this position because the syntax context does not match".to_owned(),
            ));
        }
    }

    if regex_context == RegexContext::InvalidIncompleteToken
        || char_class_context == CharClassContext::InvalidIncompleteToken
    {
        // a preceding unescaped `\` would break the sandboxing
        return Err(Error::InterpolationRejected(
            "Interpolation preceded by invalid incomplete token".to_owned(),
        ));
    }

    let (value, is_pattern) = match substitution {
        Substitution::Subexpression(subexpression) => {
            // only reachable in the default context
            return interpolate_subexpression(subexpression, flags, capabilities, preceding_captures);
        }
        Substitution::Text(text) => {
            let scan_context = if regex_context == RegexContext::CharClass {
                ScanContext::CharClass
            } else {
                ScanContext::Default
            };
            (escape_for_context(text, scan_context), false)
        }
        Substitution::Pattern(pattern) => (pattern.as_str().to_owned(), true),
    };

    // the escaped text is checked too since `>` is never escaped
    if let Some(c) = get_breakout_char(&value, regex_context, char_class_context) {
        return Err(Error::InterpolationRejected(format!(
            "Unescaped stray \"{}\" in the interpolated value would have side effects outside it",
            c
        )));
    }

    if matches!(
        regex_context,
        RegexContext::EnclosedToken | RegexContext::IntervalQuantifier | RegexContext::GroupName
    ) || matches!(
        char_class_context,
        CharClassContext::EnclosedToken | CharClassContext::QToken
    ) {
        return Ok(value);
    }

    if regex_context == RegexContext::CharClass {
        if !is_pattern {
            return Ok(if contains_char_class_union(&value) {
                format!("[{}]", value)
            } else {
                value
            });
        }

        if has_operator_at_boundary(&value) {
            return Err(Error::InterpolationRejected(
                "Cannot use range or set operator at boundary of interpolated pattern; move the operation into the pattern or the operator outside of it".to_owned(),
            ));
        }

        let sandboxed = sandbox_lone_char_class_caret(&sandbox_lone_double_punctuator_char(&value));

        // the union check looks at the value as given
        return if contains_char_class_union(&value) {
            Ok(format!("[{}]", sandboxed))
        } else {
            sandbox_unsafe_nulls(&sandboxed, None)
        };
    }

    if is_pattern || wrap_escaped_text {
        Ok(format!("(?:{})", value))
    } else {
        Ok(value)
    }
}

// a leading or trailing `-` or `&&` would join the chars outside the
// pattern into an operation
fn has_operator_at_boundary(value: &str) -> bool {
    if value.starts_with('-') || value.starts_with("&&") {
        return true;
    }

    let at_end = |input: &str, position: usize| {
        let rest = &input[position..];
        (rest == "-" || rest == "&&").then_some(rest.len())
    };
    find_unescaped(value, at_end, 0, None).is_some()
}

fn interpolate_subexpression(
    subexpression: &Subexpression,
    outer_flags: Flags,
    capabilities: &Capabilities,
    preceding_captures: usize,
) -> Result<String, Error> {
    let (value, used_modifier) =
        transform_for_local_flags(subexpression, outer_flags, capabilities)?;
    let adjusted = adjust_numbered_backreferences(&value, preceding_captures)?;

    // a modifier group is already atomic
    if used_modifier {
        Ok(adjusted)
    } else {
        Ok(format!("(?:{})", adjusted))
    }
}

/// Makes the `i`, `m` and `s` flags of the subexpression apply to its own
/// source only.
///
/// With modifier groups the source is wrapped in e.g. `(?i-m:...)`,
/// otherwise `.`, `^` and `$` are rewritten, which is not possible for `i`.
/// The rewrites use `[\s\S]` rather than `[^]`, which not every engine
/// accepts.
fn transform_for_local_flags(
    subexpression: &Subexpression,
    outer_flags: Flags,
    capabilities: &Capabilities,
) -> Result<(String, bool), Error> {
    let inner_flags = subexpression.flags();
    let differing = inner_flags.local() ^ outer_flags.local();
    let mut value = subexpression.source().to_owned();

    if differing.contains(Flags::IGNORE_CASE) && !capabilities.pattern_modifiers {
        return Err(Error::InterpolationRejected(
            "Pattern modifiers not supported, so the value of flag i on the interpolated subexpression must match the outer expression".to_owned(),
        ));
    }

    if capabilities.pattern_modifiers {
        let mut on = String::new();
        let mut off = String::new();
        for (flag, letter) in [
            (Flags::IGNORE_CASE, 'i'),
            (Flags::MULTI_LINE, 'm'),
            (Flags::DOT_ALL, 's'),
        ] {
            if differing.contains(flag) {
                if inner_flags.contains(flag) {
                    on.push(letter);
                } else {
                    off.push(letter);
                }
            }
        }

        if on.is_empty() && off.is_empty() {
            return Ok((value, false));
        }

        let modifier = if off.is_empty() {
            on
        } else {
            format!("{}-{}", on, off)
        };
        return Ok((format!("(?{}:{})", modifier, value), true));
    }

    if differing.contains(Flags::DOT_ALL) {
        let replacement = if inner_flags.contains(Flags::DOT_ALL) {
            "[\\s\\S]".to_owned()
        } else {
            format!("[^{}]", NEWLINE_CHARS)
        };
        value = replace_unescaped(
            &value,
            literal("."),
            |_| Ok(replacement.clone()),
            Some(ScanContext::Default),
        )?;
    }

    if differing.contains(Flags::MULTI_LINE) {
        let multi_line = inner_flags.contains(Flags::MULTI_LINE);
        let (start, end) = if multi_line {
            (
                format!("(?<=^|[{}])", NEWLINE_CHARS),
                format!("(?=$|[{}])", NEWLINE_CHARS),
            )
        } else {
            ("(?<![\\s\\S])".to_owned(), "(?![\\s\\S])".to_owned())
        };

        value = replace_unescaped(
            &value,
            literal("^"),
            |_| Ok(start.clone()),
            Some(ScanContext::Default),
        )?;
        value = replace_unescaped(
            &value,
            literal("$"),
            |_| Ok(end.clone()),
            Some(ScanContext::Default),
        )?;
    }

    Ok((value, false))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::Error,
        options::{Capabilities, Flags},
        pattern::{Pattern, Subexpression, Substitution},
    };

    use super::{interpolate_template, Assembled};

    const LEGACY_TARGET: Capabilities = Capabilities {
        unicode_sets: false,
        pattern_modifiers: false,
    };

    fn assemble_with(
        segments: &[&str],
        substitutions: Vec<Substitution>,
        flags: Flags,
        capabilities: &Capabilities,
    ) -> Result<Assembled, Error> {
        let segments: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        interpolate_template(&segments, &substitutions, flags, capabilities)
    }

    fn assemble(segments: &[&str], substitution: Substitution) -> Result<String, Error> {
        assemble_with(
            segments,
            vec![substitution],
            Flags::empty(),
            &Capabilities::default(),
        )
        .map(|a| a.expression)
    }

    fn text(s: &str) -> Substitution {
        Substitution::Text(s.to_owned())
    }

    fn pattern(s: &str) -> Substitution {
        Substitution::Pattern(Pattern::new(s))
    }

    fn subexpression(source: &str, flags: &str) -> Substitution {
        Substitution::Subexpression(Subexpression::with_flags(source, flags).unwrap())
    }

    #[test]
    fn test_default_context() {
        // text is wrapped only when it has neighbours
        assert_eq!(assemble(&["a", "*"], text("b.c")).unwrap(), "a(?:b\\.c)*");
        assert_eq!(assemble(&["", "*"], text("b")).unwrap(), "(?:b)*");
        assert_eq!(assemble(&["", ""], text("b.c")).unwrap(), "b\\.c");

        // patterns are always wrapped
        assert_eq!(assemble(&["", "x"], pattern("a|b")).unwrap(), "(?:a|b)x");
        assert_eq!(assemble(&["", ""], pattern("\\d+")).unwrap(), "(?:\\d+)");

        // balanced groups stay inside the value
        assert_eq!(assemble(&["", ""], pattern("(a)+")).unwrap(), "(?:(a)+)");
        assert_eq!(
            assemble(&["x", "y"], pattern("(?:a|(b))[)]")).unwrap(),
            "x(?:(?:a|(b))[)])y"
        );

        // a `\0` in a class of the raw segment
        assert_eq!(
            assemble(&["[\\0", "]"], text("1")).unwrap(),
            "[\\u{0}1]"
        );
    }

    #[test]
    fn test_token_contexts() {
        assert_eq!(assemble(&["(?<", ">.)"], text("name")).unwrap(), "(?<name>.)");
        assert_eq!(assemble(&["\\k<", ">"], pattern("name")).unwrap(), "\\k<name>");
        assert_eq!(assemble(&["a{", "}"], pattern("1,2")).unwrap(), "a{1,2}");
        assert_eq!(assemble(&["\\p{", "}"], text("L")).unwrap(), "\\p{L}");
        assert_eq!(assemble(&["[\\q{", "}]"], text("a|b")).unwrap(), "[\\q{a\\|b}]");
    }

    #[test]
    fn test_char_class_context() {
        assert_eq!(assemble(&["[", "]"], text("a")).unwrap(), "[a]");
        assert_eq!(assemble(&["[", "]"], text("a-z")).unwrap(), "[[a\\-z]]");
        assert_eq!(assemble(&["[", "]"], text("&")).unwrap(), "[\\&]");

        assert_eq!(assemble(&["[", "]"], pattern("a-z")).unwrap(), "[a-z]");
        assert_eq!(assemble(&["[", "]"], pattern("a-zA")).unwrap(), "[[a-zA]]");
        assert_eq!(assemble(&["[", "]"], pattern("\\0")).unwrap(), "[\\u{0}]");
        assert_eq!(assemble(&["[", "]"], pattern("&a")).unwrap(), "[[\\&&a]]");
        assert_eq!(assemble(&["[", "]"], pattern("a\\-")).unwrap(), "[[a\\-]]");

        for value in ["-a", "a-", "&&a", "a&&"] {
            assert!(matches!(
                assemble(&["[", "]"], pattern(value)),
                Err(Error::InterpolationRejected(_))
            ));
        }
    }

    #[test]
    fn test_reject() {
        // breakout
        assert!(matches!(
            assemble(&["", ""], pattern("a)")),
            Err(Error::InterpolationRejected(_))
        ));
        assert!(matches!(
            assemble(&["(", ""], pattern("(a))(")),
            Err(Error::InterpolationRejected(_))
        ));
        assert!(matches!(
            assemble(&["", ""], pattern("a\\")),
            Err(Error::InterpolationRejected(_))
        ));
        assert!(matches!(
            assemble(&["[", "]"], pattern("a]")),
            Err(Error::InterpolationRejected(_))
        ));
        assert!(matches!(
            assemble(&["(?<", ">"], text("a>")),
            Err(Error::InterpolationRejected(_))
        ));

        // incomplete token
        assert!(matches!(
            assemble(&["\\", ""], text("a")),
            Err(Error::InterpolationRejected(_))
        ));
        assert!(matches!(
            assemble(&["[\\u00", "]"], text("41")),
            Err(Error::InterpolationRejected(_))
        ));

        // subexpression outside the default context
        assert!(matches!(
            assemble(&["[", "]"], subexpression("a", "")),
            Err(Error::InterpolationRejected(_))
        ));
    }

    #[test]
    fn test_subexpression_with_modifiers() {
        let capabilities = Capabilities::default();
        let assemble_flags = |outer: &str, source: &str, inner: &str| {
            assemble_with(
                &["", ""],
                vec![subexpression(source, inner)],
                Flags::parse(outer).unwrap(),
                &capabilities,
            )
            .unwrap()
            .expression
        };

        assert_eq!(assemble_flags("", "a", ""), "(?:a)");
        assert_eq!(assemble_flags("i", "a", "i"), "(?:a)");
        assert_eq!(assemble_flags("", "a", "i"), "(?i:a)");
        assert_eq!(assemble_flags("i", "a", ""), "(?-i:a)");
        assert_eq!(assemble_flags("m", "a", "si"), "(?is-m:a)");
    }

    #[test]
    fn test_subexpression_without_modifiers() {
        let assemble_flags = |outer: &str, source: &str, inner: &str| {
            assemble_with(
                &["", ""],
                vec![subexpression(source, inner)],
                Flags::parse(outer).unwrap(),
                &LEGACY_TARGET,
            )
            .map(|a| a.expression)
        };

        assert_eq!(assemble_flags("", "a.b\\.", "s").unwrap(), "(?:a[\\s\\S]b\\.)");
        assert_eq!(
            assemble_flags("s", "a.[.]", "").unwrap(),
            "(?:a[^\\n\\r\\u2028\\u2029][.])"
        );
        assert_eq!(
            assemble_flags("", "^a$", "m").unwrap(),
            "(?:(?<=^|[\\n\\r\\u2028\\u2029])a(?=$|[\\n\\r\\u2028\\u2029]))"
        );
        assert_eq!(assemble_flags("m", "^a$", "").unwrap(), "(?:(?<![\\s\\S])a(?![\\s\\S]))");

        assert!(matches!(
            assemble_flags("", "a", "i"),
            Err(Error::InterpolationRejected(_))
        ));
    }

    #[test]
    fn test_capture_ledger() {
        let assembled = assemble_with(
            &["(a)", "(?<n>c)", ""],
            vec![subexpression("(b)\\1", ""), subexpression("\\1(d)", "")],
            Flags::empty(),
            &Capabilities::default(),
        )
        .unwrap();

        assert_eq!(assembled.expression, "(a)(?:(b)\\2)(?<n>c)(?:\\4(d))");
        assert_eq!(assembled.capture_count, 4);

        let assembled = assemble_with(
            &["", "", ""],
            vec![pattern("(x)"), text("(y)")],
            Flags::empty(),
            &Capabilities::default(),
        )
        .unwrap();
        assert_eq!(assembled.expression, "(?:(x))\\(y\\)");
        assert_eq!(assembled.capture_count, 1);
    }
}
