use alloc::string::String;
use core::fmt;

use crate::{Def, Element, Leaf, MetaType, Path, Reflect, construct_default};

/// The supported primitive types, in visiting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `bool`
    Bool,
    /// `String`
    String,
    /// [`Path`]
    Path,
}

impl ScalarKind {
    /// Every kind, in visiting order.
    pub const ALL: [ScalarKind; 9] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Bool,
        ScalarKind::String,
        ScalarKind::Path,
    ];

    /// Short Rust name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "String",
            ScalarKind::Path => "Path",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A borrowed scalar of any supported type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarRef<'a> {
    /// `i8`
    I8(&'a i8),
    /// `i16`
    I16(&'a i16),
    /// `i32`
    I32(&'a i32),
    /// `i64`
    I64(&'a i64),
    /// `f32`
    F32(&'a f32),
    /// `f64`
    F64(&'a f64),
    /// `bool`
    Bool(&'a bool),
    /// `String`
    String(&'a String),
    /// [`Path`]
    Path(&'a Path),
}

/// A mutably borrowed scalar of any supported type.
#[derive(Debug)]
pub enum ScalarMut<'a> {
    /// `i8`
    I8(&'a mut i8),
    /// `i16`
    I16(&'a mut i16),
    /// `i32`
    I32(&'a mut i32),
    /// `i64`
    I64(&'a mut i64),
    /// `f32`
    F32(&'a mut f32),
    /// `f64`
    F64(&'a mut f64),
    /// `bool`
    Bool(&'a mut bool),
    /// `String`
    String(&'a mut String),
    /// [`Path`]
    Path(&'a mut Path),
}

impl ScalarRef<'_> {
    /// Kind of the borrowed scalar.
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarRef::I8(_) => ScalarKind::I8,
            ScalarRef::I16(_) => ScalarKind::I16,
            ScalarRef::I32(_) => ScalarKind::I32,
            ScalarRef::I64(_) => ScalarKind::I64,
            ScalarRef::F32(_) => ScalarKind::F32,
            ScalarRef::F64(_) => ScalarKind::F64,
            ScalarRef::Bool(_) => ScalarKind::Bool,
            ScalarRef::String(_) => ScalarKind::String,
            ScalarRef::Path(_) => ScalarKind::Path,
        }
    }
}

impl fmt::Display for ScalarRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarRef::I8(v) => fmt::Display::fmt(v, f),
            ScalarRef::I16(v) => fmt::Display::fmt(v, f),
            ScalarRef::I32(v) => fmt::Display::fmt(v, f),
            ScalarRef::I64(v) => fmt::Display::fmt(v, f),
            ScalarRef::F32(v) => fmt::Display::fmt(v, f),
            ScalarRef::F64(v) => fmt::Display::fmt(v, f),
            ScalarRef::Bool(v) => fmt::Display::fmt(v, f),
            ScalarRef::String(v) => fmt::Display::fmt(v, f),
            ScalarRef::Path(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl ScalarMut<'_> {
    /// Kind of the borrowed scalar.
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarMut::I8(_) => ScalarKind::I8,
            ScalarMut::I16(_) => ScalarKind::I16,
            ScalarMut::I32(_) => ScalarKind::I32,
            ScalarMut::I64(_) => ScalarKind::I64,
            ScalarMut::F32(_) => ScalarKind::F32,
            ScalarMut::F64(_) => ScalarKind::F64,
            ScalarMut::Bool(_) => ScalarKind::Bool,
            ScalarMut::String(_) => ScalarKind::String,
            ScalarMut::Path(_) => ScalarKind::Path,
        }
    }
}

/// A primitive type that can be held by a [`Leaf`].
pub trait Scalar: Reflect + Clone + Default + PartialEq + fmt::Debug + fmt::Display {
    /// Which supported type this is.
    const KIND: ScalarKind;

    /// Whether setting `other` over `self` counts as no change.
    ///
    /// Exact equality, except for floating point where values within machine
    /// epsilon of each other are the same.
    fn same(&self, other: &Self) -> bool {
        self == other
    }

    /// Borrows as the type-erased form.
    fn as_scalar_ref(&self) -> ScalarRef<'_>;

    /// Mutably borrows as the type-erased form.
    fn as_scalar_mut(&mut self) -> ScalarMut<'_>;

    /// Recovers the typed reference, if the kinds match.
    fn from_scalar_ref(scalar: ScalarRef<'_>) -> Option<&Self>;

    /// Recovers the typed mutable reference, if the kinds match.
    fn from_scalar_mut(scalar: ScalarMut<'_>) -> Option<&mut Self>;
}

macro_rules! impl_scalar {
    ($ty:ty => $variant:ident $(, |$a:ident, $b:ident| $same:expr)?) => {
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$variant;

            $(
                fn same(&self, other: &Self) -> bool {
                    let ($a, $b) = (*self, *other);
                    $same
                }
            )?

            fn as_scalar_ref(&self) -> ScalarRef<'_> {
                ScalarRef::$variant(self)
            }

            fn as_scalar_mut(&mut self) -> ScalarMut<'_> {
                ScalarMut::$variant(self)
            }

            fn from_scalar_ref(scalar: ScalarRef<'_>) -> Option<&Self> {
                match scalar {
                    ScalarRef::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_scalar_mut(scalar: ScalarMut<'_>) -> Option<&mut Self> {
                match scalar {
                    ScalarMut::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl Reflect for $ty {
            fn meta() -> &'static MetaType {
                MetaType::builder::<$ty>()
                    .def(Def::Scalar(ScalarKind::$variant))
                    .construct(construct_default::<Leaf<$ty>>)
                    .register()
            }
        }

        impl Element for $ty {
            type Node = Leaf<$ty>;

            fn into_node(self) -> Self::Node {
                Leaf::new(self)
            }
        }
    };
}

impl_scalar!(i8 => I8);
impl_scalar!(i16 => I16);
impl_scalar!(i32 => I32);
impl_scalar!(i64 => I64);
impl_scalar!(f32 => F32, |a, b| (a - b).abs() <= f32::EPSILON);
impl_scalar!(f64 => F64, |a, b| (a - b).abs() <= f64::EPSILON);
impl_scalar!(bool => Bool);
impl_scalar!(String => String);
impl_scalar!(Path => Path);
