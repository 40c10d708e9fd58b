// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt;

use crate::error::Error;

bitflags::bitflags! {
    /// Flags of an expression.
    ///
    /// `i`, `m` and `s` are chosen by the user. `u` and `v` are implicit:
    /// exactly one of them is added by the compiler depending on whether
    /// the Unicode-sets mode is in use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const IGNORE_CASE  = 1 << 0;
        const MULTI_LINE   = 1 << 1;
        const DOT_ALL      = 1 << 2;
        const UNICODE      = 1 << 3;
        const UNICODE_SETS = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Features that can be switched off.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Disable: u8 {
        /// Implicit flag `x`: insignificant whitespace and comments.
        const WHITESPACE          = 1 << 0;
        /// Implicit flag `n`: bare parens do not capture.
        const IMPLICIT_NONCAPTURE = 1 << 1;
        /// Emit the legacy Unicode mode (`u`) even if the target supports `v`.
        const UNICODE_SETS        = 1 << 2;
        /// Atomic groups and possessive quantifiers.
        const ATOMIC              = 1 << 3;
        /// Subroutines and DEFINE groups.
        const SUBROUTINES         = 1 << 4;
        /// Removal of separators left by whitespace elision.
        const CLEANUP             = 1 << 5;
    }
}

impl Flags {
    /// Parses user flags.
    ///
    /// Only `i`, `m` and `s` are accepted, the implicit flags are
    /// controlled by the compiler.
    pub fn parse(s: &str) -> Result<Flags, Error> {
        let mut flags = Flags::empty();
        for c in s.chars() {
            let flag = match c {
                'i' => Flags::IGNORE_CASE,
                'm' => Flags::MULTI_LINE,
                's' => Flags::DOT_ALL,
                'u' | 'v' | 'x' | 'n' => {
                    return Err(Error::OptionsIncorrect(format!(
                        "Flag \"{}\" is controlled implicitly and cannot be added explicitly",
                        c
                    )));
                }
                _ => {
                    return Err(Error::OptionsIncorrect(format!("Unknown flag \"{}\"", c)));
                }
            };

            if flags.contains(flag) {
                return Err(Error::OptionsIncorrect(format!("Duplicate flag \"{}\"", c)));
            }
            flags |= flag;
        }

        Ok(flags)
    }

    /// The user-selectable part (`i`, `m`, `s`).
    pub fn local(&self) -> Flags {
        *self & (Flags::IGNORE_CASE | Flags::MULTI_LINE | Flags::DOT_ALL)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = [
            (Flags::UNICODE_SETS, 'v'),
            (Flags::UNICODE, 'u'),
            (Flags::IGNORE_CASE, 'i'),
            (Flags::MULTI_LINE, 'm'),
            (Flags::DOT_ALL, 's'),
        ];
        for (flag, letter) in letters {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// What the target engine is able to parse.
///
/// Supplied by the caller, it is never probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The extended Unicode-set character class mode (flag `v`).
    pub unicode_sets: bool,

    /// Modifier groups such as `(?i-ms:...)`.
    pub pattern_modifiers: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            unicode_sets: true,
            pattern_modifiers: true,
        }
    }
}

/// A rewrite step that runs on the assembled expression.
pub type Plugin = Box<dyn Fn(&str, Flags) -> Result<String, Error> + Send + Sync>;

/// Replacement for the legacy-mode compatibility rewriter, which runs
/// only when the Unicode-sets mode is not used.
pub enum PluginOverride {
    Builtin,
    Custom(Plugin),
    Disabled,
}

pub struct Options {
    pub flags: String,
    pub plugins: Vec<Plugin>,
    pub unicode_sets_plugin: PluginOverride,
    pub disable: Disable,
    pub force_unicode_sets: bool,
    pub capabilities: Capabilities,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            flags: String::new(),
            plugins: vec![],
            unicode_sets_plugin: PluginOverride::Builtin,
            disable: Disable::empty(),
            force_unicode_sets: false,
            capabilities: Capabilities::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.flags = flags.to_owned();
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn unicode_sets_plugin(mut self, plugin: PluginOverride) -> Self {
        self.unicode_sets_plugin = plugin;
        self
    }

    pub fn disable(mut self, disable: Disable) -> Self {
        self.disable |= disable;
        self
    }

    pub fn force_unicode_sets(mut self, force: bool) -> Self {
        self.force_unicode_sets = force;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Whether the output uses flag `v` rather than `u`.
    pub fn uses_unicode_sets(&self) -> bool {
        self.force_unicode_sets
            || (!self.disable.contains(Disable::UNICODE_SETS) && self.capabilities.unicode_sets)
    }
}

impl fmt::Debug for PluginOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginOverride::Builtin => f.write_str("Builtin"),
            PluginOverride::Custom(_) => f.write_str("Custom(..)"),
            PluginOverride::Disabled => f.write_str("Disabled"),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("flags", &self.flags)
            .field("plugins", &self.plugins.len())
            .field("unicode_sets_plugin", &self.unicode_sets_plugin)
            .field("disable", &self.disable)
            .field("force_unicode_sets", &self.force_unicode_sets)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::Error;

    use super::{Capabilities, Disable, Flags, Options};

    #[test]
    fn test_parse_flags() {
        assert_eq!(Flags::parse("").unwrap(), Flags::empty());
        assert_eq!(
            Flags::parse("si").unwrap(),
            Flags::IGNORE_CASE | Flags::DOT_ALL
        );

        // implicit flags
        for s in ["u", "v", "x", "n", "iv"] {
            assert!(matches!(Flags::parse(s), Err(Error::OptionsIncorrect(_))));
        }

        // unknown and duplicate
        assert!(matches!(Flags::parse("g"), Err(Error::OptionsIncorrect(_))));
        assert!(matches!(Flags::parse("ii"), Err(Error::OptionsIncorrect(_))));
    }

    #[test]
    fn test_display_flags() {
        assert_eq!(
            (Flags::UNICODE_SETS | Flags::parse("sm").unwrap()).to_string(),
            "vms"
        );
        assert_eq!((Flags::UNICODE | Flags::IGNORE_CASE).to_string(), "ui");
        assert_eq!(
            (Flags::UNICODE | Flags::IGNORE_CASE).local(),
            Flags::IGNORE_CASE
        );
    }

    #[test]
    fn test_uses_unicode_sets() {
        assert!(Options::new().uses_unicode_sets());
        assert!(!Options::new()
            .disable(Disable::UNICODE_SETS)
            .uses_unicode_sets());

        let legacy_target = Capabilities {
            unicode_sets: false,
            pattern_modifiers: true,
        };
        assert!(!Options::new()
            .capabilities(legacy_target)
            .uses_unicode_sets());
        assert!(Options::new()
            .capabilities(legacy_target)
            .force_unicode_sets(true)
            .uses_unicode_sets());
    }
}
