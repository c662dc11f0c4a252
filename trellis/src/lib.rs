#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use trellis_core::*;

/// Derive [`Record`](trait@Record) for a struct whose fields are trellis values.
///
/// The derive also implements [`Reflect`], so the struct gets a [`MetaType`]
/// listing its fields, and [`Element`], so it can live in a [`Sequence`] or a
/// [`KeyedCollection`] (as a [`StructNode`]).
///
/// Every field must be a trellis value: a [`Leaf`], a [`StructNode`], a
/// [`Sequence`] or a [`KeyedCollection`]. The struct itself needs `Clone`,
/// `Default`, `PartialEq` and `Debug`.
///
/// ```rust
/// # use trellis::{Leaf, Record, StructNode};
/// #[derive(Clone, Default, PartialEq, Debug, Record)]
/// struct Window {
///     title: Leaf<String>,
///     width: Leaf<i32>,
/// }
///
/// let window = StructNode::new(Window::default());
/// assert_eq!(window.field_names().collect::<Vec<_>>(), ["title", "width"]);
/// ```
///
/// This uses unsynn, so generic structs, tuple structs and enums are
/// rejected with a compile error.
///
/// # Field Attributes
///
/// ```rust
/// # use trellis::{Leaf, Record};
/// #[derive(Clone, Default, PartialEq, Debug, Record)]
/// struct Window {
///     #[trellis(rename = "caption")]
///     title: Leaf<String>,
///     #[trellis(skip)]
///     redraws: Leaf<i64>,
/// }
/// ```
///
/// * `rename = ".."` Expose the field under another child name. Names may not
///   be empty or contain `/`.
///
/// * `skip` Keep the field out of the tree: no child, no path, no
///   notifications reach the parent.
pub use trellis_macros::*;

pub use static_assertions;
