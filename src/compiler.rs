// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use log::debug;

use crate::{
    capturemap::{build_capture_map, CaptureMap},
    error::Error,
    interpolate::interpolate_template,
    options::{Capabilities, Disable, Flags, Options, PluginOverride},
    pattern::Template,
    plugins::{
        atomic::atomic, cleanup::cleanup, legacy::legacy, possessive::possessive,
        subroutines::subroutines,
    },
    preprocess::{noncapture::remove_capturing_parens, preprocess, whitespace::remove_whitespace},
};

/// The result of compiling a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The expression for the target engine, without emulation markers.
    pub expression: String,

    /// The user flags and the implicit `u` or `v`.
    pub flags: Flags,

    pub capture_map: CaptureMap,
}

/// The result of rewriting a plain expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub expression: String,
    pub flags: String,
}

type BuiltinPlugin = fn(&str) -> Result<String, Error>;

pub fn compile(template: &Template, options: &Options) -> Result<Compiled, Error> {
    compile_for(template, options, &options.capabilities)
}

/// Compiles for a target whose capabilities are known, they replace the
/// ones in `options`.
pub(crate) fn compile_for(
    template: &Template,
    options: &Options,
    capabilities: &Capabilities,
) -> Result<Compiled, Error> {
    let user_flags = Flags::parse(&options.flags)?;
    let use_unicode_sets = options.force_unicode_sets
        || (!options.disable.contains(Disable::UNICODE_SETS) && capabilities.unicode_sets);
    let flags = user_flags
        | if use_unicode_sets {
            Flags::UNICODE_SETS
        } else {
            Flags::UNICODE
        };

    debug!("compile {:?} with flags \"{}\"", template.segments, flags);

    let mut segments = template.segments.clone();
    let mut substitutions = template.substitutions.clone();

    if !options.disable.contains(Disable::WHITESPACE) {
        (segments, substitutions) = preprocess(&segments, &substitutions, remove_whitespace)?;
        debug!("whitespace removed: {:?}", segments);
    }

    if !options.disable.contains(Disable::IMPLICIT_NONCAPTURE) {
        (segments, substitutions) =
            preprocess(&segments, &substitutions, remove_capturing_parens)?;
        debug!("capturing parens removed: {:?}", segments);
    }

    let assembled = interpolate_template(&segments, &substitutions, flags, capabilities)?;
    debug!(
        "assembled /{}/ with {} captures",
        assembled.expression, assembled.capture_count
    );

    let mut expression = assembled.expression;

    for plugin in &options.plugins {
        expression = plugin(&expression, flags).map_err(|e| e.with_expression(&expression))?;
    }

    let mut builtin_plugins: Vec<(&str, BuiltinPlugin)> = vec![];

    if !options.disable.contains(Disable::ATOMIC) {
        builtin_plugins.push(("possessive", possessive));
        builtin_plugins.push(("atomic", atomic));
    }

    if !options.disable.contains(Disable::SUBROUTINES) {
        builtin_plugins.push(("subroutines", subroutines));
    }

    // only the whitespace preprocessor inserts separators
    if !options.disable.intersects(Disable::WHITESPACE | Disable::CLEANUP) {
        builtin_plugins.push(("cleanup", cleanup));
    }

    for (name, plugin) in builtin_plugins {
        expression = plugin(&expression).map_err(|e| e.with_expression(&expression))?;
        debug!("{}: /{}/", name, expression);
    }

    if !use_unicode_sets {
        expression = match &options.unicode_sets_plugin {
            PluginOverride::Builtin => legacy(&expression),
            PluginOverride::Custom(plugin) => plugin(&expression, flags),
            PluginOverride::Disabled => Ok(expression.clone()),
        }
        .map_err(|e| e.with_expression(&expression))?;
        debug!("legacy: /{}/", expression);
    }

    let (expression, capture_map) =
        build_capture_map(&expression).map_err(|e| e.with_expression(&expression))?;
    debug!("compiled /{}/{}, capture map {}", expression, flags, capture_map);

    Ok(Compiled {
        expression,
        flags,
        capture_map,
    })
}

/// Compiles an expression without interpolation.
///
/// Only the expression and its flags are returned, so synthetic groups
/// stay visible as ordinary capturing groups.
pub fn rewrite(expression: &str, options: &Options) -> Result<Rewritten, Error> {
    let compiled = compile(&Template::from(expression), options)?;
    Ok(Rewritten {
        expression: compiled.expression,
        flags: compiled.flags.to_string(),
    })
}
