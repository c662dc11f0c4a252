use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use core::cell::{Cell, OnceCell, RefCell};
use core::fmt;

use owo_colors::OwoColorize;

use crate::{MetaType, Operation, Path, Registry, Value};

/// Address of `value`, as recorded by [`Anchor::attach`] and checked by
/// [`Anchor::settle`].
pub(crate) fn address<V: ?Sized>(value: &V) -> *const () {
    value as *const V as *const ()
}

/// Callback shape for child listeners: the path of the change relative to the
/// node the listener is registered on, what happened, the node that directly
/// owns the changed value, and the new value.
pub type ChildListener = dyn Fn(&Path, Operation, &Anchor, &dyn Value);

/// Identity of a value inside its tree: its name, a non-owning link to its
/// parent, and the child listeners registered on it.
///
/// Nodes keep their anchor behind an `Rc` so that children can hold a `Weak`
/// back-link to it. The back-link never keeps a parent alive.
///
/// Child listeners receive the anchor of the node that owns the changed value.
/// To get at the node itself, resolve [`Anchor::path`] from the root.
pub struct Anchor {
    name: RefCell<String>,
    parent: RefCell<Weak<Anchor>>,
    /// Where the parent last saw the owning value
    home: Cell<*const ()>,
    meta: fn() -> &'static MetaType,
    child_listeners: OnceCell<Rc<Registry<ChildListener>>>,
    notifying: Cell<bool>,
}

impl Anchor {
    pub(crate) fn new(meta: fn() -> &'static MetaType) -> Self {
        Self {
            name: RefCell::new(String::new()),
            parent: RefCell::new(Weak::new()),
            home: Cell::new(core::ptr::null()),
            meta,
            child_listeners: OnceCell::new(),
            notifying: Cell::new(false),
        }
    }

    /// Name under which this value sits in its parent: a field name, an index
    /// or a key. Empty for a root.
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Meta type of the value this anchor belongs to.
    pub fn meta_type(&self) -> &'static MetaType {
        (self.meta)()
    }

    /// The parent's anchor, if the parent is alive.
    pub fn parent(&self) -> Option<Rc<Anchor>> {
        self.parent.borrow().upgrade()
    }

    /// True if this value has no (live) parent.
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Path from the root of the tree to this value.
    pub fn path(&self) -> Path {
        let mut path = Path::new();
        let mut parent = self.parent();
        if parent.is_some() {
            path.push(self.name());
        }
        while let Some(anchor) = parent {
            parent = anchor.parent();
            if parent.is_some() {
                path.prepend(anchor.name());
            }
        }
        path
    }

    fn link(&self, parent: &Rc<Anchor>, home: *const ()) {
        self.home.set(home);
        let linked = core::ptr::eq(self.parent.borrow().as_ptr(), Rc::as_ptr(parent));
        if !linked {
            *self.parent.borrow_mut() = Rc::downgrade(parent);
        }
    }

    /// Makes this value the child `name` of `parent`. `home` is where the
    /// parent holds the value.
    pub(crate) fn attach(&self, parent: &Rc<Anchor>, name: &str, home: *const ()) {
        self.link(parent, home);
        if *self.name.borrow() != name {
            self.rename(name);
        }
    }

    /// Makes this value the element at `index` of `parent`.
    pub(crate) fn attach_at(&self, parent: &Rc<Anchor>, index: usize, home: *const ()) {
        self.link(parent, home);
        if self.name.borrow().parse::<usize>().ok() != Some(index) {
            self.rename(index.to_string());
        }
    }

    /// Called by the owning value, found at `home`, before it acts on its
    /// own. A value that is no longer where its parent last linked it has
    /// been moved out of the tree, and becomes a root.
    pub(crate) fn settle(&self, home: *const ()) {
        if core::ptr::eq(self.home.get(), home) {
            return;
        }
        self.home.set(home);
        if self.parent.borrow().strong_count() > 0 {
            debug!("Value {} left its tree", self.path().to_string().yellow());
            self.detach();
        }
    }

    pub(crate) fn rename(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    /// Cuts the link to the parent. The name is kept.
    pub(crate) fn detach(&self) {
        *self.parent.borrow_mut() = Weak::new();
    }

    pub(crate) fn child_listeners(&self) -> &Rc<Registry<ChildListener>> {
        self.child_listeners
            .get_or_init(|| Rc::new(Registry::new()))
    }

    fn with_root<R>(&self, f: impl FnOnce(&Anchor) -> R) -> R {
        match self.parent() {
            Some(parent) => parent.with_root(f),
            None => f(self),
        }
    }

    /// True while a notification pass is running anywhere in this tree.
    pub fn is_notifying(&self) -> bool {
        self.with_root(|root| root.notifying.get())
    }

    /// Runs `notify` as this tree's notification pass.
    ///
    /// If the tree is already notifying, the change being made is nested
    /// inside another listener's callback: `notify` is skipped and the caller
    /// commits silently. Returns whether `notify` ran.
    pub(crate) fn notify_scope(&self, notify: impl FnOnce()) -> bool {
        self.with_root(|root| {
            if root.notifying.get() {
                debug!(
                    "Nested change below {} committed without notification",
                    self.path().to_string().yellow()
                );
                return false;
            }
            let _scope = NotifyingScope::enter(&root.notifying);
            notify();
            true
        })
    }

    /// Runs `change` with notifications in this tree switched off.
    pub(crate) fn silently<R>(&self, change: impl FnOnce() -> R) -> R {
        self.with_root(|root| {
            let _scope = NotifyingScope::enter(&root.notifying);
            change()
        })
    }

    /// Reports a change below this node to its child listeners, then to every
    /// ancestor with the path extended by each node's name on the way up.
    pub(crate) fn bubble(&self, mut path: Path, op: Operation, owner: &Anchor, value: &dyn Value) {
        if let Some(registry) = self.child_listeners.get() {
            let listeners = registry.snapshot();
            if !listeners.is_empty() {
                trace!(
                    "{} {} at {} ({} listener(s))",
                    op.cyan(),
                    value.meta_type().blue(),
                    path.to_string().yellow(),
                    listeners.len()
                );
            }
            for listener in listeners {
                listener(&path, op, owner, value);
            }
        }
        if let Some(parent) = self.parent() {
            path.prepend(self.name());
            parent.bubble(path, op, owner, value);
        }
    }
}

/// Sets a notifying flag and restores its previous state when dropped,
/// including during unwinding.
struct NotifyingScope<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> NotifyingScope<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for NotifyingScope<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("name", &*self.name.borrow())
            .field("path", &self.path())
            .field("meta_type", &self.meta_type().type_name)
            .finish()
    }
}
