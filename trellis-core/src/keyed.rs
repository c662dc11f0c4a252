use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::TypeId;
use core::cell::OnceCell;
use core::fmt;
use core::ops::{Index, IndexMut};

use owo_colors::OwoColorize;

use crate::{
    AccessError, Anchor, Def, Element, INVALID, Invalid, ListenerToken, MetaType, Node, Operation,
    Path, Reflect, Registry, Value, Visit, VisitMut, address, construct_default,
};

/// Callback shape for keyed collection listeners: what happened, the
/// collection, the element added or removed, and its key.
pub type KeyedListener<T> =
    dyn Fn(Operation, &KeyedCollection<T>, &<T as Element>::Node, &str);

/// String-keyed elements, iterated in insertion order.
///
/// Each element is named after its key. Adding a new key and removing a key
/// notify before the change is made. Adding an existing key overwrites that
/// element in place and notifies nobody, unlike [`Sequence`](crate::Sequence)
/// where every add is reported.
///
/// Lookup is a linear scan.
pub struct KeyedCollection<T: Element> {
    anchor: Rc<Anchor>,
    entries: Vec<(String, T::Node)>,
    listeners: OnceCell<Rc<Registry<KeyedListener<T>>>>,
}

impl<T: Element> KeyedCollection<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    fn from_entries(entries: Vec<(String, T::Node)>) -> Self {
        let collection = Self {
            anchor: Rc::new(Anchor::new(Self::meta)),
            entries,
            listeners: OnceCell::new(),
        };
        collection.relink_all();
        collection
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn relink(&self, index: usize) {
        self.anchor.settle(address(self));
        if let Some((key, node)) = self.entries.get(index) {
            Self::link(&self.anchor, node, key);
        }
    }

    fn relink_all(&self) {
        self.anchor.settle(address(self));
        for (key, node) in &self.entries {
            Self::link(&self.anchor, node, key);
        }
    }

    fn link(anchor: &Rc<Anchor>, node: &T::Node, key: &str) {
        if let Some(child) = node.anchor() {
            child.attach(anchor, key, address(node));
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if there is an entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// The element for `key`, if there is one.
    pub fn get(&self, key: &str) -> Option<&T::Node> {
        let index = self.position(key)?;
        self.relink(index);
        Some(&self.entries[index].1)
    }

    /// The element for `key` mutably, if there is one.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T::Node> {
        let index = self.position(key)?;
        self.relink(index);
        Some(&mut self.entries[index].1)
    }

    /// The stored key and element for `key`, if there is one.
    pub fn find(&self, key: &str) -> Option<(&str, &T::Node)> {
        let index = self.position(key)?;
        self.relink(index);
        let (key, node) = &self.entries[index];
        Some((key.as_str(), node))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &T::Node)> + ExactSizeIterator {
        self.relink_all();
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Entries in insertion order, with mutable elements.
    pub fn iter_mut(
        &mut self,
    ) -> impl DoubleEndedIterator<Item = (&str, &mut T::Node)> + ExactSizeIterator {
        self.relink_all();
        self.entries
            .iter_mut()
            .map(|(key, node)| (key.as_str(), node))
    }

    /// Adds `value` under `key`.
    ///
    /// A new key is notified as an `Add` before it is inserted. An existing
    /// key has its element overwritten in place without any notification.
    pub fn add_element(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        let node = value.into_node();
        match self.position(&key) {
            Some(index) => {
                self.relink(index);
                let existing = &mut self.entries[index].1;
                debug!("Overwriting {} without notification", key.yellow());
                self.anchor.silently(|| existing.assign(&node));
            }
            None => self.insert_node(key, node),
        }
    }

    fn insert_node(&mut self, key: String, node: T::Node) {
        self.anchor.settle(address(self));
        Self::link(&self.anchor, &node, &key);
        self.anchor
            .notify_scope(|| self.notify(Operation::Add, &node, &key));
        self.entries.push((key, node));
    }

    /// Removes the entry for `key`, notifying `Remove` first. Returns false
    /// if there is no such entry.
    pub fn remove_element(&mut self, key: &str) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };
        self.relink(index);
        self.anchor.notify_scope(|| {
            let (key, node) = &self.entries[index];
            self.notify(Operation::Remove, node, key);
        });
        let (_, node) = self.entries.remove(index);
        if let Some(anchor) = node.anchor() {
            anchor.detach();
        }
        true
    }

    fn notify(&self, op: Operation, node: &T::Node, key: &str) {
        trace!(
            "{} {}/{}",
            op.cyan(),
            self.anchor.path().to_string().yellow(),
            key.blue()
        );
        if let Some(registry) = self.listeners.get() {
            for listener in registry.snapshot() {
                listener(op, self, node, key);
            }
        }
        self.anchor
            .bubble(Path::from([key]), op, &self.anchor, node);
    }

    fn registry(&self) -> &Rc<Registry<KeyedListener<T>>> {
        self.listeners.get_or_init(|| Rc::new(Registry::new()))
    }

    /// Calls `listener` for every key added to or removed from this
    /// collection, until the returned token is dropped. Overwrites are not
    /// reported.
    pub fn add_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(Operation, &KeyedCollection<T>, &T::Node, &str) + 'static,
    {
        self.registry().subscribe(Rc::new(listener))
    }

    /// Like [`KeyedCollection::add_listener`], for as long as `context` is
    /// alive.
    pub fn add_listener_with<C, F>(&self, context: &Rc<C>, listener: F)
    where
        C: 'static,
        F: Fn(Operation, &KeyedCollection<T>, &T::Node, &str) + 'static,
    {
        self.registry().subscribe_with(context, Rc::new(listener));
    }
}

impl<T: Element> Index<&str> for KeyedCollection<T> {
    type Output = T::Node;

    fn index(&self, key: &str) -> &T::Node {
        match self.get(key) {
            Some(node) => node,
            None => panic!(
                "{}",
                AccessError::NoSuchKey {
                    key: key.to_string()
                }
            ),
        }
    }
}

impl<T: Element> IndexMut<&str> for KeyedCollection<T> {
    fn index_mut(&mut self, key: &str) -> &mut T::Node {
        let Some(index) = self.position(key) else {
            panic!(
                "{}",
                AccessError::NoSuchKey {
                    key: key.to_string()
                }
            )
        };
        self.relink(index);
        &mut self.entries[index].1
    }
}

impl<T: Element> Node for KeyedCollection<T> {
    fn child(&self, name: &str) -> &dyn Value {
        match self.get(name) {
            Some(node) => node,
            None => &INVALID,
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut dyn Value {
        match self.position(name) {
            Some(index) => {
                self.relink(index);
                &mut self.entries[index].1
            }
            None => Invalid::sentinel_mut(),
        }
    }

    fn fields(&self) -> Vec<&dyn Value> {
        self.iter().map(|(_, node)| node as &dyn Value).collect()
    }

    fn fields_mut(&mut self) -> Vec<&mut dyn Value> {
        self.iter_mut()
            .map(|(_, node)| node as &mut dyn Value)
            .collect()
    }

    /// Assigns to the element for `name`, or inserts a new element holding
    /// `value` (notified as an `Add`).
    fn assign_child(&mut self, name: &str, value: &dyn Value) -> bool {
        if let Some(index) = self.position(name) {
            self.relink(index);
            return self.entries[index].1.assign(value);
        }
        let mut node = T::Node::default();
        if !node.assign(value) {
            return false;
        }
        self.insert_node(name.to_string(), node);
        true
    }

    fn remove_child(&mut self, name: &str) -> bool {
        self.remove_element(name)
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

impl<T: Element> Reflect for KeyedCollection<T> {
    fn meta() -> &'static MetaType {
        MetaType::builder::<Self>()
            .def(Def::Map(T::meta))
            .construct(construct_default::<Self>)
            .register()
    }
}

impl<T: Element> Value for KeyedCollection<T> {
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

    /// With the same keys in the same order, assigns element by element.
    /// Otherwise removes every entry and adds copies of `other`'s.
    fn assign(&mut self, other: &dyn Value) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        self.relink_all();
        let same_keys = self.entries.len() == other.entries.len()
            && self.keys().eq(other.keys());
        if same_keys {
            for ((_, mine), (_, theirs)) in self.entries.iter_mut().zip(&other.entries) {
                mine.assign(theirs);
            }
            return true;
        }
        while let Some(key) = self.entries.last().map(|(key, _)| key.clone()) {
            self.remove_element(&key);
        }
        for (key, node) in &other.entries {
            self.insert_node(key.clone(), node.clone());
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

impl<T: Element> Element for KeyedCollection<T> {
    type Node = Self;

    fn into_node(self) -> Self {
        self
    }
}

/// Deep copy: the copy is detached and no listener comes along.
impl<T: Element> Clone for KeyedCollection<T> {
    fn clone(&self) -> Self {
        Self::from_entries(self.entries.clone())
    }
}

impl<T: Element> Default for KeyedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Order-sensitive: the same entries inserted in a different order are not
/// equal.
impl<T: Element> PartialEq for KeyedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: Element> fmt::Debug for KeyedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, node)| (key, node)))
            .finish()
    }
}

impl<K: Into<String>, T: Element> FromIterator<(K, T)> for KeyedCollection<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

/// Adds each entry with [`KeyedCollection::add_element`].
impl<K: Into<String>, T: Element> Extend<(K, T)> for KeyedCollection<T> {
    fn extend<I: IntoIterator<Item = (K, T)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add_element(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Leaf, NodeExt, Sequence};
    use alloc::format;
    use alloc::vec;
    use core::cell::{Cell, RefCell};
    use trellis_testhelpers::test;

    type Log = Rc<RefCell<Vec<String>>>;

    fn watch<N: Node + ?Sized>(node: &N) -> (Log, ListenerToken) {
        let log = Log::default();
        let token = node.add_child_listener({
            let log = log.clone();
            move |path: &Path, op: Operation, _: &Anchor, value: &dyn Value| {
                log.borrow_mut().push(format!("{op} {path} {value}"));
            }
        });
        (log, token)
    }

    #[test]
    fn re_adding_a_key_overwrites_silently() {
        let mut collection = KeyedCollection::new();
        let (log, _token) = watch(&collection);
        let typed = Rc::new(Cell::new(0));
        let _typed_token = collection.add_listener({
            let typed = typed.clone();
            move |_, _: &KeyedCollection<i32>, _: &Leaf<i32>, _: &str| typed.set(typed.get() + 1)
        });

        collection.add_element("k", 10);
        assert_eq!(*log.borrow(), ["add k 10"]);
        assert_eq!(typed.get(), 1);

        collection.add_element("k", 20);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection["k"].get(), 20);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(typed.get(), 1);
    }

    #[test]
    fn overwrite_keeps_existing_listeners_quiet() {
        let mut collection: KeyedCollection<f32> = KeyedCollection::new();
        collection.add_element("gain", 0.5);
        let count = Rc::new(Cell::new(0));
        let _token = collection["gain"].add_listener({
            let count = count.clone();
            move |_, _| count.set(count.get() + 1)
        });
        collection.add_element("gain", 0.75);
        assert_eq!(count.get(), 0);
        collection["gain"].set(1.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn add_and_remove_notify_before_the_change() {
        let mut collection: KeyedCollection<String> = KeyedCollection::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _token = collection.add_listener({
            let seen = seen.clone();
            move |op, collection: &KeyedCollection<String>, node: &Leaf<String>, key: &str| {
                seen.borrow_mut().push((
                    op,
                    key.to_string(),
                    node.get(),
                    collection.contains(key),
                    collection.len(),
                ));
            }
        });
        collection.add_element("a", "alpha".to_string());
        assert!(collection.remove_element("a"));
        assert!(!collection.remove_element("a"));
        assert_eq!(
            *seen.borrow(),
            [
                (Operation::Add, "a".to_string(), "alpha".to_string(), false, 0),
                (Operation::Remove, "a".to_string(), "alpha".to_string(), true, 1),
            ]
        );
    }

    #[test]
    fn insertion_order_is_iteration_order() {
        let collection: KeyedCollection<i8> = [("z", 1), ("a", 2), ("m", 3)].into_iter().collect();
        assert_eq!(collection.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
        let names: Vec<String> = collection.iter().map(|(_, node)| node.name()).collect();
        assert_eq!(names, ["z", "a", "m"]);
        assert_eq!(collection.child_names(), ["z", "a", "m"]);
        assert_eq!(collection.find("a").map(|(k, v)| (k, v.get())), Some(("a", 2)));
        assert!(collection.get("b").is_none());
    }

    #[test]
    fn equality_is_order_sensitive() {
        let ab: KeyedCollection<i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let ab_again: KeyedCollection<i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let ba: KeyedCollection<i32> = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(ab, ab_again);
        assert_ne!(ab, ba);
    }

    #[test]
    fn nested_paths_use_keys() {
        let mut collection: KeyedCollection<Sequence<bool>> = KeyedCollection::new();
        collection.add_element("flags", Sequence::from(vec![false, false]));
        let (log, _token) = watch(&collection);
        collection["flags"][1].set(true);
        collection["flags"].add_element(true);
        assert!(collection.remove_element("flags"));
        assert_eq!(
            *log.borrow(),
            [
                "modify flags/1 true",
                "add flags/2 true",
                "remove flags { .0 = false, .1 = true, .2 = true }"
            ]
        );
    }

    #[test]
    fn assign_child_inserts_or_assigns() {
        let mut collection: KeyedCollection<i64> = KeyedCollection::new();
        let (log, _token) = watch(&collection);
        assert!(collection.assign_child("x", &Leaf::new(3i64)));
        assert!(collection.assign_child("x", &Leaf::new(4i64)));
        assert!(!collection.assign_child("y", &Leaf::new(4i32)));
        assert_eq!(*log.borrow(), ["add x 3", "modify x 4"]);
        assert!(collection.remove_child("x"));
        assert!(!collection.remove_child("x"));
        assert!(!collection.child("x").is_valid());
    }

    #[test]
    fn assign_from_another_collection() {
        let mut target: KeyedCollection<i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let (log, _token) = watch(&target);

        let same_keys: KeyedCollection<i32> = [("a", 1), ("b", 5)].into_iter().collect();
        assert!(target.assign(&same_keys));
        assert_eq!(*log.borrow(), ["modify b 5"]);

        log.borrow_mut().clear();
        let other_keys: KeyedCollection<i32> = [("c", 7)].into_iter().collect();
        assert!(target.assign(&other_keys));
        assert_eq!(target, other_keys);
        assert_eq!(*log.borrow(), ["remove b 5", "remove a 1", "add c 7"]);
    }

    #[test]
    #[should_panic]
    fn missing_key_index_panics() {
        let collection: KeyedCollection<i32> = KeyedCollection::new();
        let _ = &collection["nothing"];
    }

    #[test]
    fn debug_and_meta() {
        let collection: KeyedCollection<bool> = [("on", true)].into_iter().collect();
        assert_eq!(format!("{collection:?}"), r#"{"on": true}"#);
        assert!(collection.meta_type().is_map());
        assert_eq!(collection.element_type(), Some(TypeId::of::<bool>()));
    }
}
