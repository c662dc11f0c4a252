#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

#[macro_use]
mod macros;

// Addressing
mod path;
pub use path::*;

// Static shape descriptors
mod meta;
pub use meta::*;

// Supported leaf types
mod scalar;
pub use scalar::*;

// Subscriptions and tokens
mod listener;
pub use listener::*;

// Back-links and notification propagation
mod anchor;
pub use anchor::*;

// Type-erased values and visiting
mod value;
pub use value::*;

mod node;
pub use node::*;

mod leaf;
pub use leaf::*;

mod record;
pub use record::*;

mod sequence;
pub use sequence::*;

mod keyed;
pub use keyed::*;

mod error;
pub use error::*;

/// A type that can live inside a [`Sequence`] or a [`KeyedCollection`].
///
/// Scalars are stored as [`Leaf`]s, records as [`StructNode`]s, and containers
/// as themselves.
pub trait Element: Reflect + Clone + Default + PartialEq + core::fmt::Debug {
    /// The node that holds one element inside a container.
    type Node: Value + Clone + Default + PartialEq + core::fmt::Debug;

    /// Wraps a plain element into its node.
    fn into_node(self) -> Self::Node;
}
