use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

/// What happened to a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// An element was added to a container
    Add,
    /// An element was removed from a container
    Remove,
    /// A leaf was given a new value
    Modify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Modify => "modify",
        })
    }
}

/// Who keeps a subscription alive.
enum Owner {
    /// Removed when its [`ListenerToken`] is dropped
    Token,
    /// Removed at the first notification pass after the context is gone
    Context(Weak<dyn Any>),
}

struct Entry<F: ?Sized> {
    id: u64,
    owner: Owner,
    callback: Rc<F>,
}

/// A list of subscriptions sharing one callback signature `F`.
///
/// Notification works on a snapshot of the callbacks, so callbacks may
/// subscribe or unsubscribe (by dropping tokens) while they run.
pub struct Registry<F: ?Sized> {
    entries: RefCell<Vec<Entry<F>>>,
    next_id: Cell<u64>,
}

impl<F: ?Sized + 'static> Registry<F> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn insert(&self, owner: Owner, callback: Rc<F>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Entry {
            id,
            owner,
            callback,
        });
        id
    }

    /// Adds a subscription that lives until the returned token is dropped.
    pub fn subscribe(self: &Rc<Self>, callback: Rc<F>) -> ListenerToken {
        let id = self.insert(Owner::Token, callback);
        let registry: Rc<dyn Unsubscribe> = self.clone();
        ListenerToken {
            slot: Some((Rc::downgrade(&registry), id)),
        }
    }

    /// Adds a subscription that lives as long as `context` does.
    pub fn subscribe_with<C: 'static>(&self, context: &Rc<C>, callback: Rc<F>) {
        let context: Weak<C> = Rc::downgrade(context);
        self.insert(Owner::Context(context), callback);
    }

    /// Removes subscriptions whose context is gone.
    pub fn prune(&self) {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| match &entry.owner {
            Owner::Token => true,
            Owner::Context(context) => context.strong_count() > 0,
        });
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("Pruned {pruned} expired listener(s)");
        }
    }

    /// Prunes, then returns the live callbacks in subscription order.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.prune();
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.callback.clone())
            .collect()
    }

    /// Number of subscriptions, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: ?Sized + 'static> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

trait Unsubscribe {
    fn unsubscribe(&self, id: u64);
}

impl<F: ?Sized> Unsubscribe for Registry<F> {
    fn unsubscribe(&self, id: u64) {
        self.entries.borrow_mut().retain(|entry| entry.id != id);
    }
}

/// Keeps a listener registered. Dropping the token removes the listener.
///
/// A default-constructed token is not attached to anything and does nothing
/// when dropped.
#[derive(Default)]
#[must_use = "dropping a ListenerToken removes its listener immediately"]
pub struct ListenerToken {
    slot: Option<(Weak<dyn Unsubscribe>, u64)>,
}

impl ListenerToken {
    /// True while the listener is registered and its source is alive.
    pub fn is_active(&self) -> bool {
        match &self.slot {
            Some((registry, _)) => registry.strong_count() > 0,
            None => false,
        }
    }

    /// Removes the listener now.
    pub fn release(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some((registry, id)) = self.slot.take() {
            if let Some(registry) = registry.upgrade() {
                registry.unsubscribe(id);
            }
        }
    }
}

impl Drop for ListenerToken {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for ListenerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerToken")
            .field("active", &self.is_active())
            .finish()
    }
}
