// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

// The built-in rewrite steps, in the order they run:
//
// 1. possessive quantifiers -> atomic groups
// 2. atomic groups -> lookahead with a backreference
// 3. subroutines and DEFINE groups
// 4. separator cleanup
// 5. legacy (non Unicode-sets) compatibility
//
// Each step takes the whole expression and returns the rewritten one.
// Capturing groups added by a step are marked with `EMULATION_MARKER`,
// they are removed from the visible numbering by the capture map builder.

pub mod atomic;
pub mod cleanup;
pub mod legacy;
pub mod possessive;
pub mod subroutines;
