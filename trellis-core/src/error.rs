use alloc::string::String;

use owo_colors::OwoColorize;

use crate::{MetaType, Path};

/// Errors that can occur when reading or resolving values.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum AccessError {
    /// Tried to read a value as the wrong type, e.g. a `String` leaf was
    /// visited as an `i32`.
    WrongType {
        /// The type the caller asked for.
        expected: &'static MetaType,
        /// The type of the value.
        actual: &'static MetaType,
    },

    /// A path segment named no child.
    NoSuchChild {
        /// The part of the path that did resolve.
        path: Path,
        /// The segment that did not.
        segment: String,
    },

    /// A path went through a value that has no children.
    NotANode {
        /// Path to the value that is not a node.
        path: Path,
    },

    /// A sequence index was past the end.
    IndexOutOfBounds {
        /// The index asked for
        index: usize,
        /// The length of the sequence
        len: usize,
    },

    /// A keyed collection has no entry for the key.
    NoSuchKey {
        /// The key asked for
        key: String,
    },
}

impl core::fmt::Display for AccessError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccessError::WrongType { expected, actual } => {
                write!(
                    f,
                    "Wrong type: expected {}, but got {}",
                    expected.green(),
                    actual.red()
                )
            }
            AccessError::NoSuchChild { path, segment } => {
                write!(
                    f,
                    "No child '{}' under '{}'",
                    segment.red(),
                    path.yellow()
                )
            }
            AccessError::NotANode { path } => {
                write!(f, "Value at '{}' has no children", path.yellow())
            }
            AccessError::IndexOutOfBounds { index, len } => {
                write!(
                    f,
                    "Index {} out of bounds for sequence of length {}",
                    index.red(),
                    len.blue()
                )
            }
            AccessError::NoSuchKey { key } => {
                write!(f, "No entry for key '{}'", key.red())
            }
        }
    }
}

impl core::error::Error for AccessError {}
