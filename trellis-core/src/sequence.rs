use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::any::TypeId;
use core::cell::OnceCell;
use core::fmt;
use core::ops::{Index, IndexMut};

use owo_colors::OwoColorize;

use crate::{
    AccessError, Anchor, Def, Element, INVALID, Invalid, ListenerToken, MetaType, Node, Operation,
    Path, Reflect, Registry, Value, Visit, VisitMut, address, construct_default, index_segment,
};

/// Callback shape for sequence listeners: what happened, the sequence, the
/// element added or removed, and its index.
pub type SequenceListener<T> =
    dyn Fn(Operation, &Sequence<T>, &<T as Element>::Node, usize);

/// An ordered, index-addressed list of elements.
///
/// Each element is named after its current index, so removing an element
/// renames every element after it. Adding and removing notify before the
/// change is made: a listener sees the sequence as it was.
///
/// Indexing out of range panics, like a slice. [`Sequence::get`] is the
/// checked form.
pub struct Sequence<T: Element> {
    anchor: Rc<Anchor>,
    elements: Vec<T::Node>,
    listeners: OnceCell<Rc<Registry<SequenceListener<T>>>>,
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

impl<T: Element> Sequence<T> {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::from_nodes(Vec::new())
    }

    fn from_nodes(elements: Vec<T::Node>) -> Self {
        let sequence = Self {
            anchor: Rc::new(Anchor::new(Self::meta)),
            elements,
            listeners: OnceCell::new(),
        };
        sequence.relink_all();
        sequence
    }

    fn relink(&self, index: usize) {
        self.anchor.settle(address(self));
        if let Some(element) = self.elements.get(index) {
            Self::link(&self.anchor, element, index);
        }
    }

    fn relink_all(&self) {
        self.anchor.settle(address(self));
        for (index, element) in self.elements.iter().enumerate() {
            Self::link(&self.anchor, element, index);
        }
    }

    fn link(anchor: &Rc<Anchor>, element: &T::Node, index: usize) {
        if let Some(child) = element.anchor() {
            child.attach_at(anchor, index, address(element));
        }
    }

    fn out_of_bounds(&self, index: usize) -> ! {
        panic!(
            "{}",
            AccessError::IndexOutOfBounds {
                index,
                len: self.elements.len(),
            }
        )
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&T::Node> {
        self.relink(index);
        self.elements.get(index)
    }

    /// The element at `index` mutably, if there is one.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T::Node> {
        self.relink(index);
        self.elements.get_mut(index)
    }

    /// Appends `value`, notifying `Add` with the new index first.
    pub fn add_element(&mut self, value: T) {
        self.push_node(value.into_node());
    }

    fn push_node(&mut self, node: T::Node) {
        let index = self.elements.len();
        self.anchor.settle(address(self));
        Self::link(&self.anchor, &node, index);
        self.anchor
            .notify_scope(|| self.notify(Operation::Add, &node, index));
        self.elements.push(node);
    }

    /// Removes and returns the element at `index`, notifying `Remove` first.
    /// Later elements move down one index.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn remove_element(&mut self, index: usize) -> T::Node {
        if index >= self.elements.len() {
            self.out_of_bounds(index);
        }
        self.relink(index);
        self.anchor
            .notify_scope(|| self.notify(Operation::Remove, &self.elements[index], index));
        let node = self.elements.remove(index);
        if let Some(anchor) = node.anchor() {
            anchor.detach();
        }
        for later in index..self.elements.len() {
            self.relink(later);
        }
        node
    }

    fn notify(&self, op: Operation, node: &T::Node, index: usize) {
        trace!(
            "{} {}[{}]",
            op.cyan(),
            self.anchor.path().to_string().yellow(),
            index.blue()
        );
        if let Some(registry) = self.listeners.get() {
            for listener in registry.snapshot() {
                listener(op, self, node, index);
            }
        }
        let path = Path::from(vec![index_segment(index)]);
        self.anchor.bubble(path, op, &self.anchor, node);
    }

    fn registry(&self) -> &Rc<Registry<SequenceListener<T>>> {
        self.listeners.get_or_init(|| Rc::new(Registry::new()))
    }

    /// Calls `listener` for every element added to or removed from this
    /// sequence, until the returned token is dropped.
    pub fn add_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(Operation, &Sequence<T>, &T::Node, usize) + 'static,
    {
        self.registry().subscribe(Rc::new(listener))
    }

    /// Like [`Sequence::add_listener`], for as long as `context` is alive.
    pub fn add_listener_with<C, F>(&self, context: &Rc<C>, listener: F)
    where
        C: 'static,
        F: Fn(Operation, &Sequence<T>, &T::Node, usize) + 'static,
    {
        self.registry().subscribe_with(context, Rc::new(listener));
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> core::slice::Iter<'_, T::Node> {
        self.relink_all();
        self.elements.iter()
    }

    /// Iterates mutably over the elements in order.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T::Node> {
        self.relink_all();
        self.elements.iter_mut()
    }
}

impl<T: Element> Index<usize> for Sequence<T> {
    type Output = T::Node;

    fn index(&self, index: usize) -> &T::Node {
        match self.get(index) {
            Some(element) => element,
            None => self.out_of_bounds(index),
        }
    }
}

impl<T: Element> IndexMut<usize> for Sequence<T> {
    fn index_mut(&mut self, index: usize) -> &mut T::Node {
        if index >= self.elements.len() {
            self.out_of_bounds(index);
        }
        self.relink(index);
        &mut self.elements[index]
    }
}

impl<'a, T: Element> IntoIterator for &'a Sequence<T> {
    type Item = &'a T::Node;
    type IntoIter = core::slice::Iter<'a, T::Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Element> IntoIterator for &'a mut Sequence<T> {
    type Item = &'a mut T::Node;
    type IntoIter = core::slice::IterMut<'a, T::Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: Element> Node for Sequence<T> {
    fn child(&self, name: &str) -> &dyn Value {
        match parse_index(name).and_then(|index| self.get(index)) {
            Some(element) => element,
            None => &INVALID,
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut dyn Value {
        match parse_index(name) {
            Some(index) if index < self.elements.len() => &mut self[index],
            _ => Invalid::sentinel_mut(),
        }
    }

    fn fields(&self) -> Vec<&dyn Value> {
        self.iter().map(|element| element as &dyn Value).collect()
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Value> {
        self.iter_mut()
            .map(|element| element as &mut dyn Value)
            .collect()
    }

    /// Within range, assigns to the element. At or past the end, pads with
    /// default elements up to `name` and then appends `value`. Each appended
    /// element is notified as an `Add`.
    fn assign_child(&mut self, name: &str, value: &dyn Value) -> bool {
        let Some(index) = parse_index(name) else {
            return false;
        };
        if index < self.elements.len() {
            return self[index].assign(value);
        }
        let mut node = T::Node::default();
        if !node.assign(value) {
            return false;
        }
        while self.elements.len() < index {
            self.push_node(T::Node::default());
        }
        self.push_node(node);
        true
    }

    fn remove_child(&mut self, name: &str) -> bool {
        match parse_index(name) {
            Some(index) if index < self.elements.len() => {
                self.remove_element(index);
                true
            }
            _ => false,
        }
    }

    fn element_type(&self) -> Option<TypeId> {
        Some(TypeId::of::<T>())
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

impl<T: Element> Reflect for Sequence<T> {
    fn meta() -> &'static MetaType {
        MetaType::builder::<Self>()
            .def(Def::Array(T::meta))
            .construct(construct_default::<Self>)
            .register()
    }
}

impl<T: Element> Value for Sequence<T> {
    fn meta_type(&self) -> &'static MetaType {
        Self::meta()
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

    /// Assigns element by element, then removes surplus elements from the
    /// end or appends copies of the missing ones.
    fn assign(&mut self, other: &dyn Value) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        self.relink_all();
        let common = self.elements.len().min(other.elements.len());
        for (mine, theirs) in self.elements.iter_mut().zip(&other.elements[..common]) {
            mine.assign(theirs);
        }
        while self.elements.len() > other.elements.len() {
            self.remove_element(self.elements.len() - 1);
        }
        for node in &other.elements[common..] {
            self.push_node(node.clone());
        }
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

impl<T: Element> Element for Sequence<T> {
    type Node = Self;

    fn into_node(self) -> Self {
        self
    }
}

/// Deep copy: the copy is detached and no listener comes along.
impl<T: Element> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self::from_nodes(self.elements.clone())
    }
}

impl<T: Element> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> PartialEq for Sequence<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Element> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.elements).finish()
    }
}

impl<T: Element> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_nodes(iter.into_iter().map(Element::into_node).collect())
    }
}

impl<T: Element> From<Vec<T>> for Sequence<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

/// Appends each value with [`Sequence::add_element`], notifying each time.
impl<T: Element> Extend<T> for Sequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add_element(value);
        }
    }
}
