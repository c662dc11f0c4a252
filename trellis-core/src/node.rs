use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::TypeId;

use crate::{AccessError, Anchor, INVALID, Invalid, ListenerToken, Operation, Path, Value};

/// A value with named children: a [`StructNode`](crate::StructNode), a
/// [`Sequence`](crate::Sequence) or a [`KeyedCollection`](crate::KeyedCollection).
pub trait Node: Value {
    /// The first immediate child called `name`, or [`Invalid`].
    fn child(&self, name: &str) -> &dyn Value;

    /// Mutable form of [`Node::child`].
    fn child_mut(&mut self, name: &str) -> &mut dyn Value;

    /// The current immediate children, in order.
    fn fields(&self) -> Vec<&dyn Value>;

    /// Mutable form of [`Node::fields`].
    fn fields_mut(&mut self) -> Vec<&mut dyn Value>;

    /// Assigns `value` to the child `name`, creating it if this node is a
    /// container. Returns false if there is no such child and none can be
    /// created, or if `value` has the wrong type.
    fn assign_child(&mut self, name: &str, value: &dyn Value) -> bool;

    /// Removes the child `name`. Always false for records.
    fn remove_child(&mut self, name: &str) -> bool;

    /// Element type for sequences and keyed collections, `None` for records.
    fn element_type(&self) -> Option<TypeId> {
        None
    }

    /// This node as a value.
    fn as_value(&self) -> &dyn Value;

    /// This node as a mutable value.
    fn as_value_mut(&mut self) -> &mut dyn Value;

    #[doc(hidden)]
    fn node_anchor(&self) -> &Rc<Anchor>;

    /// Walks `path` one segment at a time. The empty path is this node itself;
    /// a segment that does not resolve, or that would have to go through
    /// something that is not a node, gives [`Invalid`].
    fn get_child(&self, path: &Path) -> &dyn Value {
        let mut current = self.as_value();
        for segment in path {
            let Some(node) = current.as_node() else {
                return &INVALID;
            };
            current = node.child(segment);
        }
        current
    }

    /// Mutable form of [`Node::get_child`].
    fn get_child_mut(&mut self, path: &Path) -> &mut dyn Value {
        let mut current = self.as_value_mut();
        for segment in path {
            match current.as_node_mut() {
                Some(node) => current = node.child_mut(segment),
                None => return Invalid::sentinel_mut(),
            }
        }
        current
    }

    /// Like [`Node::get_child`], but says where resolution stopped.
    fn try_get_child(&self, path: &Path) -> Result<&dyn Value, AccessError> {
        let mut current = self.as_value();
        let mut walked = Path::new();
        for segment in path {
            let Some(node) = current.as_node() else {
                return Err(AccessError::NotANode { path: walked });
            };
            current = node.child(segment);
            if !current.is_valid() {
                return Err(AccessError::NoSuchChild {
                    path: walked,
                    segment: segment.clone(),
                });
            }
            walked.push(segment.as_str());
        }
        Ok(current)
    }

    /// Names of the current immediate children, in order.
    fn child_names(&self) -> Vec<alloc::string::String> {
        self.fields().into_iter().map(|field| field.name()).collect()
    }
}

/// Listener registration for every [`Node`], including `dyn Node`.
pub trait NodeExt: Node {
    /// Calls `listener` for every change at any depth below this node, until
    /// the returned token is dropped.
    ///
    /// The listener receives the path of the change relative to this node,
    /// the operation, the anchor of the node that directly owns the changed
    /// value, and the new (or removed) value. It runs before the change is
    /// committed.
    fn add_child_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&Path, Operation, &Anchor, &dyn Value) + 'static,
    {
        self.node_anchor().child_listeners().subscribe(Rc::new(listener))
    }

    /// Like [`NodeExt::add_child_listener`], but the listener lives as long as
    /// `context` does and is pruned at the first notification after that.
    fn add_child_listener_with<C, F>(&self, context: &Rc<C>, listener: F)
    where
        C: 'static,
        F: Fn(&Path, Operation, &Anchor, &dyn Value) + 'static,
    {
        self.node_anchor()
            .child_listeners()
            .subscribe_with(context, Rc::new(listener));
    }
}

impl<N: Node + ?Sized> NodeExt for N {}
