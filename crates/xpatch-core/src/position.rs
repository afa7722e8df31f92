/*
 * position.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Insertion positions.
 */

//! Placement of inserted content.

use crate::error::PatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where content goes relative to a target element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Default,
    Replace,
    Merge,
    Append,
    Prepend,
    Before,
    After,
}

impl Position {
    pub const ALL: [Position; 7] = [
        Position::Default,
        Position::Replace,
        Position::Merge,
        Position::Append,
        Position::Prepend,
        Position::Before,
        Position::After,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Default => "Default",
            Position::Replace => "Replace",
            Position::Merge => "Merge",
            Position::Append => "Append",
            Position::Prepend => "Prepend",
            Position::Before => "Before",
            Position::After => "After",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = PatchError;

    /// Names are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PatchError::configuration(format!("invalid position '{}'", s)))
    }
}
