// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

mod backend;
mod capturemap;
mod compiler;
mod error;
mod interpolate;
mod options;
mod pattern;
mod plugins;
mod preprocess;
mod printer;
mod regex;

pub mod context;
pub mod escape;
pub mod scanner;

pub use capturemap::{CaptureMap, CaptureSlot};
pub use compiler::{compile, rewrite, Compiled, Rewritten};
pub use error::Error;
pub use options::{Capabilities, Disable, Flags, Options, Plugin, PluginOverride};
pub use pattern::{Pattern, Subexpression, Substitution, Template};
pub use regex::{CaptureMatches, Captures, Match, Matches, Regex};
