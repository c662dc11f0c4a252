use alloc::boxed::Box;
use core::any::TypeId;
use core::fmt;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use owo_colors::OwoColorize;

use crate::{ScalarKind, Value};

/// Types with a process-wide [`MetaType`].
///
/// Implemented for every supported scalar, for [`Sequence`](crate::Sequence)
/// and [`KeyedCollection`](crate::KeyedCollection), and by `#[derive(Record)]`
/// for declared structs. Nodes report the meta type of the type they hold, so
/// `Leaf<f32>` shares the meta type of `f32`.
pub trait Reflect: 'static {
    /// Returns the singleton describing `Self`.
    fn meta() -> &'static MetaType;
}

/// Returns the singleton [`MetaType`] of `T`.
///
/// Repeated calls return the identical reference.
pub fn meta_type_of<T: Reflect + ?Sized>() -> &'static MetaType {
    T::meta()
}

/// Describes the shape of a declared type, independently of any instance.
pub struct MetaType {
    /// Identity of the described type (`()` for the invalid sentinel)
    pub id: TypeId,

    /// Fully qualified type name, for messages
    pub type_name: &'static str,

    /// What kind of shape this is
    pub def: Def,

    /// Builds a blank, default-valued instance
    pub construct: Option<fn() -> Box<dyn Value>>,
}

/// The kind of shape a [`MetaType`] describes.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum Def {
    /// Nothing at all: only the invalid sentinel has this shape
    Void,

    /// One of the supported primitive types
    Scalar(ScalarKind),

    /// A declared struct with named fields, in declaration order
    Record(&'static [FieldDescriptor]),

    /// A [`Sequence`](crate::Sequence) of elements of the given type
    Array(fn() -> &'static MetaType),

    /// A [`KeyedCollection`](crate::KeyedCollection) of elements of the given type
    Map(fn() -> &'static MetaType),
}

/// Describes one field of a record: its name and the meta type of its value.
///
/// The meta type is resolved through a function so that declared types may
/// refer to each other.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    /// Name of the field, as seen by paths and child listeners
    pub name: &'static str,

    /// Meta type of the field's value
    pub meta_type: fn() -> &'static MetaType,
}

impl FieldDescriptor {
    /// Creates a new descriptor.
    pub const fn new(name: &'static str, meta_type: fn() -> &'static MetaType) -> Self {
        Self { name, meta_type }
    }

    /// Resolves the meta type of the field's value.
    pub fn meta_type(&self) -> &'static MetaType {
        (self.meta_type)()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("meta_type", &self.meta_type().type_name)
            .finish()
    }
}

impl MetaType {
    /// Returns a builder for a meta type describing `T`.
    pub fn builder<T: ?Sized + 'static>() -> MetaTypeBuilder {
        MetaTypeBuilder {
            id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            def: Def::Void,
            construct: None,
        }
    }

    /// Identity of the described type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Kind of shape.
    pub fn def(&self) -> Def {
        self.def
    }

    /// True for scalars and for the invalid sentinel: values with no
    /// observable children.
    pub fn is_opaque(&self) -> bool {
        matches!(self.def, Def::Void | Def::Scalar(_))
    }

    /// True for declared structs.
    pub fn is_record(&self) -> bool {
        matches!(self.def, Def::Record(_))
    }

    /// True for sequences.
    pub fn is_array(&self) -> bool {
        matches!(self.def, Def::Array(_))
    }

    /// True for keyed collections.
    pub fn is_map(&self) -> bool {
        matches!(self.def, Def::Map(_))
    }

    /// Returns the scalar kind, if this describes a scalar.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.def {
            Def::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns the fields of a record, in declaration order. Empty for every
    /// other shape.
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        match self.def {
            Def::Record(fields) => fields,
            _ => &[],
        }
    }

    /// Returns the field named `name`, if this is a record that has one.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// Returns the meta type of the elements of a sequence or keyed collection.
    pub fn element_meta_type(&self) -> Option<&'static MetaType> {
        match self.def {
            Def::Array(element) | Def::Map(element) => Some(element()),
            _ => None,
        }
    }

    /// Builds a fresh, default-valued, detached instance of the described
    /// type. Returns `None` for the invalid sentinel.
    pub fn construct(&self) -> Option<Box<dyn Value>> {
        self.construct.map(|construct| construct())
    }
}

impl PartialEq for MetaType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MetaType {}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl fmt::Debug for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.def {
            Def::Void => "void",
            Def::Scalar(_) => "scalar",
            Def::Record(_) => "record",
            Def::Array(_) => "array",
            Def::Map(_) => "map",
        };
        f.debug_struct("MetaType")
            .field("type_name", &self.type_name)
            .field("kind", &kind)
            .finish()
    }
}

/// Builder for [`MetaType`].
pub struct MetaTypeBuilder {
    id: TypeId,
    type_name: &'static str,
    def: Def,
    construct: Option<fn() -> Box<dyn Value>>,
}

impl MetaTypeBuilder {
    /// Sets the kind of shape.
    pub fn def(mut self, def: Def) -> Self {
        self.def = def;
        self
    }

    /// Sets the factory for blank instances.
    pub fn construct(mut self, construct: fn() -> Box<dyn Value>) -> Self {
        self.construct = Some(construct);
        self
    }

    /// Builds the meta type without registering it.
    pub fn build(self) -> MetaType {
        MetaType {
            id: self.id,
            type_name: self.type_name,
            def: self.def,
            construct: self.construct,
        }
    }

    /// Returns the registered singleton for this type id, registering the
    /// built meta type if this is the first request.
    pub fn register(self) -> &'static MetaType {
        let id = self.id;
        let existing = registry().get(&id).copied();
        if let Some(existing) = existing {
            return existing;
        }

        let built = self.build();
        let mut registry = registry();
        *registry.entry(id).or_insert_with(|| {
            debug!("Registering meta type {}", built.type_name.blue());
            Box::leak(Box::new(built))
        })
    }
}

type Registry = HashMap<TypeId, &'static MetaType>;

static REGISTRY: LazyLock<Mutex<Registry>> = LazyLock::new(Default::default);

fn registry() -> std::sync::MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory used by [`MetaTypeBuilder::construct`] for types with a `Default`.
pub fn construct_default<V: Value + Default>() -> Box<dyn Value> {
    Box::new(V::default())
}

/// Returns the meta type of a record.
///
/// `#[derive(Record)]` implements [`Reflect`] in terms of this.
pub fn record_meta<T: crate::Record>() -> &'static MetaType {
    MetaType::builder::<T>()
        .def(Def::Record(T::FIELDS))
        .construct(construct_default::<crate::StructNode<T>>)
        .register()
}
