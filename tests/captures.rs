// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use pretty_assertions::assert_eq;

use regex_extended::{Disable, Options, Regex};

fn captured<'a>(re: &Regex, text: &'a str) -> Option<Vec<Option<&'a str>>> {
    re.captures(text)
        .unwrap()
        .map(|captures| captures.matches.iter().map(|m| m.as_ref().map(|m| m.value)).collect())
}

fn numbered() -> Options {
    Options::new().disable(Disable::IMPLICIT_NONCAPTURE)
}

#[test]
fn test_user_numbering_is_restored() {
    let cases: &[(&str, Options, &str, Option<Vec<Option<&str>>>)] = &[
        (
            "^(?<a>x)(?>y)(?<b>z)\\g<a>$",
            Options::default(),
            "xyzx",
            Some(vec![Some("xyzx"), Some("x"), Some("z")]),
        ),
        (
            "^(?<word>[a-z]+)\\d++$",
            Options::default(),
            "abc123",
            Some(vec![Some("abc123"), Some("abc")]),
        ),
        (
            "^(?<n>(?<char>.)\\k<char>)\\g<n>$",
            Options::default(),
            "aabb",
            Some(vec![Some("aabb"), Some("aa"), Some("a")]),
        ),
        (
            "^(?<n>(?<char>.)\\k<char>)\\g<n>$",
            Options::default(),
            "aabc",
            None,
        ),
        (
            "^(?<a>x)(?>(?<b>y+))-\\k<b>\\g<a>$",
            Options::default(),
            "xyy-yyx",
            Some(vec![Some("xyy-yyx"), Some("x"), Some("yy")]),
        ),
        (
            "^(?<a>x)(?>(?<b>y+))-\\k<b>\\g<a>$",
            Options::default(),
            "xyy-yx",
            None,
        ),
        (
            "^(?>(?<d>\\d+))$",
            Options::default(),
            "123",
            Some(vec![Some("123"), Some("123")]),
        ),
        (
            "^\\g<d>-\\g<d>$(?(DEFINE)(?<d>\\d+))",
            Options::default(),
            "12-34",
            Some(vec![Some("12-34")]),
        ),
        (
            "^(a)(?>(b))\\2\\1$",
            numbered(),
            "abba",
            Some(vec![Some("abba"), Some("a"), Some("b")]),
        ),
        (
            "^(?<x>(a)\\2)\\g<x>\\2$",
            numbered(),
            "aaaaa",
            Some(vec![Some("aaaaa"), Some("aa"), Some("a")]),
        ),
        (
            "^(?<x>(a)\\2)\\g<x>\\2$",
            numbered(),
            "aaaa",
            None,
        ),
    ];

    for (expression, options, text, expected) in cases {
        let re = Regex::with_options(expression, options).unwrap();
        assert_eq!(
            &captured(&re, text),
            expected,
            "/{}/ as /{}/ on {:?}",
            expression,
            re.as_str(),
            text
        );
    }
}

#[test]
fn test_atomic_groups_agree_with_engine() {
    let cases: &[(&str, &[&str])] = &[
        ("(a)(?>(b+)|c)-\\2", &["abb-bb", "ac-", "xab-b", "abb-b"]),
        ("^(?>(a|ab))(c|bcd)(d*)$", &["abcd", "acd", "abc"]),
        ("((?>a+))b\\1", &["aaabaaa", "ab", "b"]),
        ("(?>(?>(a)b)|(a))c", &["abc", "ac", "c"]),
        ("(x)(?>(y)(?>(z)))\\3\\2\\1", &["xyzzyx", "xyzzy"]),
    ];

    for (expression, texts) in cases {
        let re = Regex::with_options(expression, &numbered()).unwrap();
        let native = fancy_regex::Regex::new(expression).unwrap();

        for text in texts.iter() {
            let expected = native.captures(text).unwrap().map(|captures| {
                captures
                    .iter()
                    .map(|m| m.map(|m| m.as_str()))
                    .collect::<Vec<_>>()
            });
            assert_eq!(
                captured(&re, text),
                expected,
                "/{}/ as /{}/ on {:?}",
                expression,
                re.as_str(),
                text
            );
        }
    }
}
