use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{OnceCell, RefCell};
use core::cmp::Ordering;
use core::fmt;

use owo_colors::OwoColorize;

use crate::{
    Anchor, ListenerToken, MetaType, Operation, Path, Reflect, Registry, Scalar, Value, Visit,
    VisitMut, address,
};

/// Callback shape for leaf listeners: the leaf, and the value it is about to
/// take.
pub type LeafListener<T> = dyn Fn(&Leaf<T>, &T);

/// Holds one scalar and tells its listeners when it changes.
///
/// A leaf is always valid. Setting a value equal to the current one does
/// nothing (floats compare within machine epsilon). Any other change notifies
/// the leaf's own listeners and then the child listeners of every ancestor,
/// *before* the new value is committed: a listener that reads the leaf sees
/// the old value.
///
/// ```
/// # use trellis_core::Leaf;
/// # use std::{cell::Cell, rc::Rc};
/// let leaf = Leaf::new(1.0f32);
/// let seen = Rc::new(Cell::new(0.0));
/// let token = leaf.add_listener({
///     let seen = seen.clone();
///     move |leaf, new| {
///         assert_eq!(leaf.get(), 1.0);
///         seen.set(*new);
///     }
/// });
/// leaf.set(2.5);
/// assert_eq!(seen.get(), 2.5);
/// assert_eq!(leaf.get(), 2.5);
/// drop(token);
/// ```
pub struct Leaf<T: Scalar> {
    value: RefCell<T>,
    anchor: Anchor,
    listeners: OnceCell<Rc<Registry<LeafListener<T>>>>,
}

impl<T: Scalar> Leaf<T> {
    /// Creates a detached leaf.
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            anchor: Anchor::new(T::meta),
            listeners: OnceCell::new(),
        }
    }

    fn named(value: T, name: &str) -> Self {
        let leaf = Self::new(value);
        leaf.anchor.rename(name);
        leaf
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Calls `f` with the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replaces the value, notifying first unless the new value is the same
    /// as the current one.
    pub fn set(&self, value: T) {
        if self.value.borrow().same(&value) {
            return;
        }
        self.anchor.settle(address(self));
        self.anchor.notify_scope(|| self.notify(&value));
        *self.value.borrow_mut() = value;
    }

    /// Changes a copy of the value with `f`, then sets it.
    pub fn mutate(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    fn notify(&self, value: &T) {
        trace!(
            "{} {} -> {}",
            Operation::Modify.cyan(),
            self.anchor.path().to_string().yellow(),
            value.green()
        );
        if let Some(registry) = self.listeners.get() {
            for listener in registry.snapshot() {
                listener(self, value);
            }
        }
        if let Some(parent) = self.anchor.parent() {
            let name = self.anchor.name();
            let new = Self::named(value.clone(), &name);
            parent.bubble(Path::from([name.as_str()]), Operation::Modify, &parent, &new);
        }
    }

    fn registry(&self) -> &Rc<Registry<LeafListener<T>>> {
        self.listeners.get_or_init(|| Rc::new(Registry::new()))
    }

    /// Calls `listener` with the new value on every change, until the
    /// returned token is dropped.
    pub fn add_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&Leaf<T>, &T) + 'static,
    {
        self.registry().subscribe(Rc::new(listener))
    }

    /// Calls `listener` with the new value on every change, for as long as
    /// `context` is alive.
    pub fn add_listener_with<C, F>(&self, context: &Rc<C>, listener: F)
    where
        C: 'static,
        F: Fn(&Leaf<T>, &T) + 'static,
    {
        self.registry().subscribe_with(context, Rc::new(listener));
    }

    /// Consumes the leaf and returns its value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Scalar> Reflect for Leaf<T> {
    fn meta() -> &'static MetaType {
        T::meta()
    }
}

impl<T: Scalar> Value for Leaf<T> {
    fn meta_type(&self) -> &'static MetaType {
        T::meta()
    }

    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }

    fn assign(&mut self, other: &dyn Value) -> bool {
        match other.downcast_ref::<Leaf<T>>() {
            Some(other) => {
                self.set(other.get());
                true
            }
            None => false,
        }
    }

    fn visit_dyn(&self, visitor: &mut dyn FnMut(Visit<'_>)) {
        let value = self.get();
        visitor(Visit::Scalar(value.as_scalar_ref()));
    }

    fn visit_mut_dyn(&mut self, visitor: &mut dyn FnMut(VisitMut<'_>)) {
        let mut value = self.get();
        visitor(VisitMut::Scalar(value.as_scalar_mut()));
        self.set(value);
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| self == other)
    }
}

/// Copies the value only: the copy is detached and has no listeners.
impl<T: Scalar> Clone for Leaf<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Scalar> Default for Leaf<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Scalar> From<T> for Leaf<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Scalar> PartialEq for Leaf<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.value.borrow() == *other.value.borrow()
    }
}

impl<T: Scalar> PartialEq<T> for Leaf<T> {
    fn eq(&self, other: &T) -> bool {
        *self.value.borrow() == *other
    }
}

impl<T: Scalar + PartialOrd> PartialOrd for Leaf<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.borrow().partial_cmp(&other.value.borrow())
    }
}

impl<T: Scalar> fmt::Debug for Leaf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value.borrow(), f)
    }
}

impl<T: Scalar> fmt::Display for Leaf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.value.borrow(), f)
    }
}
