use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::{
    Anchor, FieldDescriptor, INVALID, Invalid, MetaType, Node, Reflect, Value, Visit, VisitMut,
    address,
};

/// A plain struct whose fields are trellis values.
///
/// Implemented by `#[derive(Record)]`, which lists the fields in declaration
/// order. [`Record::field_values`] and [`Record::field_values_mut`] must
/// yield exactly one value per entry of [`Record::FIELDS`], in the same
/// order.
pub trait Record: Reflect + Clone + Default + PartialEq + fmt::Debug {
    /// Name and meta type of each field, in declaration order.
    const FIELDS: &'static [FieldDescriptor];

    /// The fields, in declaration order.
    fn field_values(&self) -> Vec<&dyn Value>;

    /// The fields, mutably, in declaration order.
    fn field_values_mut(&mut self) -> Vec<&mut dyn Value>;

    /// Copies the members that are not fields of the tree from `other`.
    /// Called by [`Value::assign`] after the fields have been assigned.
    fn assign_skipped(&mut self, _other: &Self) {}
}

/// A [`Record`] as a node of a tree.
///
/// The record's fields are its children, named after the fields. Fields stay
/// reachable as ordinary Rust fields through `Deref`, so `point.x.set(1.0)`
/// notifies `point`'s child listeners with the path `x`.
///
/// Children are linked to the node whenever they are reached through it.
/// A field replaced wholesale through `DerefMut` is linked on the next access,
/// and the value moved out becomes the root of its own tree the next time it
/// is used.
pub struct StructNode<T: Record> {
    anchor: Rc<Anchor>,
    value: T,
}

impl<T: Record> StructNode<T> {
    /// Wraps `value` and links its fields.
    pub fn new(value: T) -> Self {
        let node = Self {
            anchor: Rc::new(Anchor::new(T::meta)),
            value,
        };
        node.relink();
        node
    }

    fn relink(&self) {
        self.anchor.settle(address(self));
        for (descriptor, field) in T::FIELDS.iter().zip(self.value.field_values()) {
            if let Some(anchor) = field.anchor() {
                anchor.attach(&self.anchor, descriptor.name, address(field));
            }
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl ExactSizeIterator<Item = &'static str> {
        T::FIELDS.iter().map(|field| field.name)
    }

    /// Calls `f` on every field, in declaration order.
    pub fn visit_fields(&self, mut f: impl FnMut(&FieldDescriptor, &dyn Value)) {
        for (descriptor, field) in T::FIELDS.iter().zip(self.fields()) {
            f(descriptor, field);
        }
    }

    /// Calls `f` on every field mutably, in declaration order.
    pub fn visit_fields_mut(&mut self, mut f: impl FnMut(&FieldDescriptor, &mut dyn Value)) {
        for (descriptor, field) in T::FIELDS.iter().zip(self.fields_mut()) {
            f(descriptor, field);
        }
    }

    /// Calls `f` on the field called `name`. `None` if there is none.
    pub fn visit_field<R>(&self, name: &str, f: impl FnOnce(&dyn Value) -> R) -> Option<R> {
        let index = T::FIELDS.iter().position(|field| field.name == name)?;
        self.fields().into_iter().nth(index).map(f)
    }

    /// Calls `f` on the field called `name`, mutably. `None` if there is
    /// none.
    pub fn visit_field_mut<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn Value) -> R,
    ) -> Option<R> {
        let index = T::FIELDS.iter().position(|field| field.name == name)?;
        self.fields_mut().into_iter().nth(index).map(f)
    }

    /// Unwraps the record. Its fields keep a dead parent link.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Record> Deref for StructNode<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.relink();
        &self.value
    }
}

impl<T: Record> DerefMut for StructNode<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.relink();
        &mut self.value
    }
}

impl<T: Record> Node for StructNode<T> {
    fn child(&self, name: &str) -> &dyn Value {
        T::FIELDS
            .iter()
            .zip(self.fields())
            .find(|(field, _)| field.name == name)
            .map(|(_, value)| value)
            .unwrap_or(&INVALID)
    }

    fn child_mut(&mut self, name: &str) -> &mut dyn Value {
        match T::FIELDS.iter().position(|field| field.name == name) {
            Some(index) => match self.fields_mut().into_iter().nth(index) {
                Some(field) => field,
                None => Invalid::sentinel_mut(),
            },
            None => Invalid::sentinel_mut(),
        }
    }

    fn fields(&self) -> Vec<&dyn Value> {
        self.relink();
        self.value.field_values()
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Value> {
        self.relink();
        self.value.field_values_mut()
    }

    fn assign_child(&mut self, name: &str, value: &dyn Value) -> bool {
        self.child_mut(name).assign(value)
    }

    fn remove_child(&mut self, _name: &str) -> bool {
        false
    }

    fn as_value(&self) -> &dyn Value {
        self
    }

    fn as_value_mut(&mut self) -> &mut dyn Value {
        self
    }

    fn node_anchor(&self) -> &Rc<Anchor> {
        &self.anchor
    }
}

impl<T: Record> Reflect for StructNode<T> {
    fn meta() -> &'static MetaType {
        T::meta()
    }
}

impl<T: Record> Value for StructNode<T> {
    fn meta_type(&self) -> &'static MetaType {
        T::meta()
    }

    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }

    fn as_node(&self) -> Option<&dyn Node> {
        Some(self)
    }

    fn as_node_mut(&mut self) -> Option<&mut dyn Node> {
        Some(self)
    }

    fn assign(&mut self, other: &dyn Value) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        for (mine, theirs) in self.fields_mut().into_iter().zip(other.fields()) {
            mine.assign(theirs);
        }
        self.value.assign_skipped(&other.value);
        true
    }

    fn visit_dyn(&self, visitor: &mut dyn FnMut(Visit<'_>)) {
        visitor(Visit::Node(self))
    }

    fn visit_mut_dyn(&mut self, visitor: &mut dyn FnMut(VisitMut<'_>)) {
        visitor(VisitMut::Node(self))
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| self == other)
    }
}

/// Deep copy: the copy is detached and no listener comes along.
impl<T: Record> Clone for StructNode<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: Record> Default for StructNode<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Record> From<T> for StructNode<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Record> PartialEq for StructNode<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Record> fmt::Debug for StructNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}
