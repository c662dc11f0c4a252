use alloc::boxed::Box;
use alloc::string::String;
use core::any::{Any, TypeId};
use core::fmt;

use crate::{
    AccessError, Anchor, Def, MetaType, Node, Path, Reflect, Scalar, ScalarMut, ScalarRef,
    address,
};

/// Anything that can sit in a trellis tree: a [`Leaf`](crate::Leaf), one of the
/// three node kinds, or the [`Invalid`] sentinel.
///
/// `Value` is object safe. Generic helpers live on `dyn Value` itself, see
/// [`visit`](#method.visit), [`visit_as`](#method.visit_as) and
/// [`downcast_ref`](#method.downcast_ref).
pub trait Value: Any {
    /// Meta type of the held type.
    fn meta_type(&self) -> &'static MetaType;

    /// False only for [`Invalid`].
    fn is_valid(&self) -> bool {
        true
    }

    /// This value's identity in its tree. `None` only for [`Invalid`].
    fn anchor(&self) -> Option<&Anchor>;

    /// Name under which this value sits in its parent. Empty for roots and
    /// for [`Invalid`].
    fn name(&self) -> String {
        self.anchor().map(Anchor::name).unwrap_or_default()
    }

    /// Path from the root of this value's tree to this value.
    fn path(&self) -> Path {
        match self.anchor() {
            Some(anchor) => {
                anchor.settle(address(self));
                anchor.path()
            }
            None => Path::new(),
        }
    }

    /// The node contract, for records, sequences and keyed collections.
    fn as_node(&self) -> Option<&dyn Node> {
        None
    }

    /// Mutable form of [`Value::as_node`].
    fn as_node_mut(&mut self) -> Option<&mut dyn Node> {
        None
    }

    /// True for records, sequences and keyed collections.
    fn is_node(&self) -> bool {
        self.as_node().is_some()
    }

    /// Copies `other` into `self` if both have the same concrete type, firing
    /// the usual notifications for whatever changes. Returns false and leaves
    /// `self` untouched otherwise.
    fn assign(&mut self, other: &dyn Value) -> bool;

    /// Calls `visitor` exactly once with the matching alternative.
    fn visit_dyn(&self, visitor: &mut dyn FnMut(Visit<'_>));

    /// Calls `visitor` exactly once with the matching mutable alternative.
    ///
    /// Leaves hand out a copy of their value and set it back afterwards, so a
    /// change made through the visitor notifies exactly like [`Leaf::set`].
    ///
    /// [`Leaf::set`]: crate::Leaf::set
    fn visit_mut_dyn(&mut self, visitor: &mut dyn FnMut(VisitMut<'_>));

    /// Deep, detached copy without listeners.
    fn clone_value(&self) -> Box<dyn Value>;

    /// Deep equality with a value of the same concrete type.
    fn eq_value(&self, other: &dyn Value) -> bool;
}

/// One alternative of a shared visit.
#[derive(Clone, Copy)]
pub enum Visit<'a> {
    /// The invalid sentinel
    Invalid,
    /// A record, sequence or keyed collection
    Node(&'a dyn Node),
    /// A leaf's value
    Scalar(ScalarRef<'a>),
}

/// One alternative of a mutable visit.
pub enum VisitMut<'a> {
    /// The invalid sentinel
    Invalid,
    /// A record, sequence or keyed collection
    Node(&'a mut dyn Node),
    /// A copy of a leaf's value, written back after the visit
    Scalar(ScalarMut<'a>),
}

impl dyn Value {
    /// Concrete type of this value.
    pub fn value_type_id(&self) -> TypeId {
        (self as &dyn Any).type_id()
    }

    /// Returns the concrete value, if it is a `V`.
    pub fn downcast_ref<V: Value>(&self) -> Option<&V> {
        (self as &dyn Any).downcast_ref::<V>()
    }

    /// Returns the concrete value mutably, if it is a `V`.
    pub fn downcast_mut<V: Value>(&mut self) -> Option<&mut V> {
        (self as &mut dyn Any).downcast_mut::<V>()
    }

    /// Dispatches to the one alternative that matches this value.
    pub fn visit<R>(&self, f: impl FnOnce(Visit<'_>) -> R) -> R {
        let mut f = Some(f);
        let mut out = None;
        self.visit_dyn(&mut |visit| {
            if let Some(f) = f.take() {
                out = Some(f(visit));
            }
        });
        match out {
            Some(out) => out,
            None => unreachable!("{} did not dispatch its visitor", self.meta_type()),
        }
    }

    /// Mutable form of [`visit`](#method.visit).
    pub fn visit_mut<R>(&mut self, f: impl FnOnce(VisitMut<'_>) -> R) -> R {
        let meta = self.meta_type();
        let mut f = Some(f);
        let mut out = None;
        self.visit_mut_dyn(&mut |visit| {
            if let Some(f) = f.take() {
                out = Some(f(visit));
            }
        });
        match out {
            Some(out) => out,
            None => unreachable!("{meta} did not dispatch its visitor"),
        }
    }

    /// Reads the scalar as a `T`.
    pub fn try_visit_as<T: Scalar, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, AccessError> {
        self.visit(|visit| match visit {
            Visit::Scalar(scalar) => match T::from_scalar_ref(scalar) {
                Some(value) => Ok(f(value)),
                None => Err(self.wrong_type::<T>()),
            },
            Visit::Node(_) | Visit::Invalid => Err(self.wrong_type::<T>()),
        })
    }

    /// Reads the scalar as a `T`.
    ///
    /// # Panics
    ///
    /// If this is not a leaf holding a `T`. Use [`try_visit_as`] when the
    /// type is not known.
    ///
    /// [`try_visit_as`]: #method.try_visit_as
    pub fn visit_as<T: Scalar, R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.try_visit_as(f) {
            Ok(out) => out,
            Err(err) => panic!("{err}"),
        }
    }

    /// Changes the scalar as a `T`, notifying if the value changed.
    pub fn try_visit_mut_as<T: Scalar, R>(
        &mut self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, AccessError> {
        let error = self.wrong_type::<T>();
        self.visit_mut(|visit| match visit {
            VisitMut::Scalar(scalar) => match T::from_scalar_mut(scalar) {
                Some(value) => Ok(f(value)),
                None => Err(error),
            },
            VisitMut::Node(_) | VisitMut::Invalid => Err(error),
        })
    }

    /// Changes the scalar as a `T`, notifying if the value changed.
    ///
    /// # Panics
    ///
    /// If this is not a leaf holding a `T`.
    pub fn visit_mut_as<T: Scalar, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        match self.try_visit_mut_as(f) {
            Ok(out) => out,
            Err(err) => panic!("{err}"),
        }
    }

    /// Copies the scalar out, if this is a leaf holding a `T`.
    pub fn get<T: Scalar>(&self) -> Option<T> {
        self.try_visit_as(T::clone).ok()
    }

    fn wrong_type<T: Scalar>(&self) -> AccessError {
        AccessError::WrongType {
            expected: T::meta(),
            actual: self.meta_type(),
        }
    }
}

impl PartialEq for dyn Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_value(other)
    }
}

/// Scalars print their value, nodes print `{ .name = value, ... }`, and
/// [`Invalid`] prints nothing.
impl fmt::Display for dyn Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.visit(|visit| match visit {
            Visit::Invalid => Ok(()),
            Visit::Scalar(scalar) => write!(f, "{scalar}"),
            Visit::Node(node) => {
                let fields = node.fields();
                if fields.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, field) in fields.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, ".{} = {}", field.name(), field)?;
                }
                f.write_str(" }")
            }
        })
    }
}

impl fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.meta_type().type_name, self)
    }
}

/// The value returned for anything that does not exist.
///
/// Always invalid, never a node, and refuses every assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalid;

/// The process-wide invalid sentinel.
pub static INVALID: Invalid = Invalid;

impl Invalid {
    /// A mutable invalid sentinel.
    ///
    /// `Invalid` is zero-sized, so this does not allocate.
    pub fn sentinel_mut() -> &'static mut Invalid {
        Box::leak(Box::new(Invalid))
    }
}

impl Reflect for Invalid {
    fn meta() -> &'static MetaType {
        MetaType::builder::<()>().def(Def::Void).register()
    }
}

impl Value for Invalid {
    fn meta_type(&self) -> &'static MetaType {
        Self::meta()
    }

    fn is_valid(&self) -> bool {
        false
    }

    fn anchor(&self) -> Option<&Anchor> {
        None
    }

    fn assign(&mut self, _other: &dyn Value) -> bool {
        false
    }

    fn visit_dyn(&self, visitor: &mut dyn FnMut(Visit<'_>)) {
        visitor(Visit::Invalid)
    }

    fn visit_mut_dyn(&mut self, visitor: &mut dyn FnMut(VisitMut<'_>)) {
        visitor(VisitMut::Invalid)
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(Invalid)
    }

    fn eq_value(&self, other: &dyn Value) -> bool {
        !other.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Leaf;
    use trellis_testhelpers::test;

    #[test]
    fn invalid_sentinel() {
        let invalid: &dyn Value = &INVALID;
        assert!(!invalid.is_valid());
        assert!(!invalid.is_node());
        assert!(invalid.name().is_empty());
        assert!(invalid.anchor().is_none());
        assert_eq!(invalid.to_string(), "");
        assert!(invalid.visit(|visit| matches!(visit, Visit::Invalid)));

        let sentinel: &mut dyn Value = Invalid::sentinel_mut();
        assert!(!sentinel.assign(&Leaf::new(1i32)));
        assert!(!sentinel.assign(&Invalid));
    }

    #[test]
    fn typed_visits() {
        let mut leaf = Leaf::new(4i32);
        let value: &mut dyn Value = &mut leaf;

        assert_eq!(value.visit_as(|v: &i32| *v * 2), 8);
        assert!(value.try_visit_as(|_: &f32| ()).is_err());
        assert_eq!(value.get::<i32>(), Some(4));
        assert_eq!(value.get::<i64>(), None);

        value.visit_mut_as(|v: &mut i32| *v += 1);
        assert_eq!(leaf.get(), 5);
    }

    #[test]
    fn wrong_type_names_both_sides() {
        let leaf = Leaf::new(String::from("hi"));
        let value: &dyn Value = &leaf;
        let err = value.try_visit_as(|_: &Path| ()).unwrap_err();
        assert_eq!(
            err,
            AccessError::WrongType {
                expected: Path::meta(),
                actual: String::meta(),
            }
        );
    }

    #[test]
    #[should_panic]
    fn visit_as_wrong_type_panics() {
        let leaf = Leaf::new(true);
        let value: &dyn Value = &leaf;
        value.visit_as(|_: &i8| ());
    }

    #[test]
    fn display_scalars() {
        assert_eq!((&Leaf::new(42i32) as &dyn Value).to_string(), "42");
        assert_eq!((&Leaf::new(true) as &dyn Value).to_string(), "true");
        assert_eq!(
            (&Leaf::new(String::from("hello")) as &dyn Value).to_string(),
            "hello"
        );
        assert_eq!(
            (&Leaf::new(Path::parse("a/b/c")) as &dyn Value).to_string(),
            "a/b/c"
        );
    }
}
