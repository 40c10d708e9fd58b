// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::{self, Display};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// Malformed extended syntax, e.g. a possessive quantifier with
    /// nothing to quantify, or an unclosed DEFINE group.
    SyntaxIncorrect(String),

    /// An interpolated value cannot be placed at its position,
    /// or it would change the meaning of the tokens around it.
    InterpolationRejected(String),

    /// The expression is well-formed but refers to something that
    /// does not exist, e.g. a subroutine to an undefined group,
    /// a recursive subroutine, or an out-of-range backreference.
    SemanticIncorrect(String),

    /// Invalid flags or options.
    OptionsIncorrect(String),

    /// The target engine refused the generated expression,
    /// or failed while matching.
    EngineRejected(String),
}

impl Error {
    pub fn message(&self) -> &str {
        match self {
            Error::SyntaxIncorrect(m)
            | Error::InterpolationRejected(m)
            | Error::SemanticIncorrect(m)
            | Error::OptionsIncorrect(m)
            | Error::EngineRejected(m) => m,
        }
    }

    /// Appends the expression being processed when the error occurred.
    pub fn with_expression(self, expression: &str) -> Self {
        let append = |m: String| format!("{}, in expression: /{}/", m, expression);
        match self {
            Error::SyntaxIncorrect(m) => Error::SyntaxIncorrect(append(m)),
            Error::InterpolationRejected(m) => Error::InterpolationRejected(append(m)),
            Error::SemanticIncorrect(m) => Error::SemanticIncorrect(append(m)),
            Error::OptionsIncorrect(m) => Error::OptionsIncorrect(append(m)),
            Error::EngineRejected(m) => Error::EngineRejected(append(m)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SyntaxIncorrect(msg) => write!(f, "Syntax error: {}", msg),
            Error::InterpolationRejected(msg) => write!(f, "Interpolation error: {}", msg),
            Error::SemanticIncorrect(msg) => write!(f, "Semantic error: {}", msg),
            Error::OptionsIncorrect(msg) => write!(f, "Options error: {}", msg),
            Error::EngineRejected(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<fancy_regex::Error> for Error {
    fn from(value: fancy_regex::Error) -> Self {
        Error::EngineRejected(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Error;

    #[test]
    fn test_error_with_expression() {
        let error = Error::SemanticIncorrect("Invalid subroutine \\g<a>".to_owned());
        assert_eq!(
            error.with_expression("(?<b>)\\g<a>"),
            Error::SemanticIncorrect(
                "Invalid subroutine \\g<a>, in expression: /(?<b>)\\g<a>/".to_owned()
            )
        );

        assert_eq!(
            Error::OptionsIncorrect("Unknown flag \"g\"".to_owned()).to_string(),
            "Options error: Unknown flag \"g\""
        );
    }
}
