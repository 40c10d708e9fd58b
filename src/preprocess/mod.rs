// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

pub mod noncapture;
pub mod whitespace;

use crate::{
    context::Context,
    error::Error,
    pattern::{Pattern, Substitution},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub transformed: String,
    pub context: Context,
}

/// Transforms one piece of raw source, given the context at its start.
pub type Preprocessor = fn(&str, Context) -> Result<Preprocessed, Error>;

/// Runs the preprocessor over the raw segments and the `Pattern`
/// substitutions, threading the context from one piece to the next.
///
/// `Text` and `Subexpression` substitutions are never preprocessed.
pub fn preprocess(
    segments: &[String],
    substitutions: &[Substitution],
    preprocessor: Preprocessor,
) -> Result<(Vec<String>, Vec<Substitution>), Error> {
    let mut new_segments = Vec::with_capacity(segments.len());
    let mut new_substitutions = Vec::with_capacity(substitutions.len());
    let mut context = Context::default();

    for (idx, segment) in segments.iter().enumerate() {
        let result = preprocessor(segment, restart(context))?;
        new_segments.push(result.transformed);
        context = result.context;

        if let Some(substitution) = substitutions.get(idx) {
            match substitution {
                Substitution::Pattern(pattern) => {
                    let result = preprocessor(pattern.as_str(), restart(context))?;
                    new_substitutions.push(Substitution::Pattern(Pattern::new(&result.transformed)));
                    context = result.context;
                }
                other => new_substitutions.push(other.clone()),
            }
        }
    }

    Ok((new_segments, new_substitutions))
}

// each piece is scanned as its own string
fn restart(context: Context) -> Context {
    Context {
        last_scanned_offset: 0,
        ..context
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::pattern::{Pattern, Substitution};

    use super::{noncapture::remove_capturing_parens, preprocess, whitespace::remove_whitespace};

    #[test]
    fn test_preprocess_threads_context() {
        // the class opened in the first segment continues in the pattern
        let segments = vec!["[ a".to_owned(), "b ]".to_owned()];
        let substitutions = vec![Substitution::Pattern(Pattern::new(" c"))];

        let (segments, substitutions) =
            preprocess(&segments, &substitutions, remove_whitespace).unwrap();
        assert_eq!(segments, vec!["[a", "b]"]);
        assert_eq!(
            substitutions,
            vec![Substitution::Pattern(Pattern::new("c"))]
        );
    }

    #[test]
    fn test_preprocess_skips_text() {
        let segments = vec!["(".to_owned(), ")".to_owned()];
        let substitutions = vec![Substitution::Text("(".to_owned())];

        let (segments, substitutions) =
            preprocess(&segments, &substitutions, remove_capturing_parens).unwrap();
        assert_eq!(segments, vec!["(?:", ")"]);
        assert_eq!(substitutions, vec![Substitution::Text("(".to_owned())]);
    }
}
