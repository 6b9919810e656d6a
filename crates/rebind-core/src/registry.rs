//! Stable integer identities for render shapes.
//!
//! Two render targets are interchangeable when their items share a shape:
//! the same bind structure producing the same kind of presentation object.
//! [`TypeRegistry`] assigns every distinct [`ShapeKey`] a durable
//! [`RenderTypeId`] so pools can recycle targets across unrelated list
//! instances. Ids are process-lifetime: the registry only ever grows.

use std::any::TypeId;
use std::borrow::Cow;
use std::sync::Mutex;

use rustc_hash::FxHashMap;

/// Ids below this value are reserved for callers' fixed assignments; the
/// registry allocates dynamic ids from here upward.
pub const FIRST_DYNAMIC_TYPE_ID: u32 = 64;

/// Durable integer identity of a render shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTypeId(u32);

impl RenderTypeId {
    /// A fixed id in the reserved range, for callers that assign ids
    /// statically instead of going through the registry.
    pub const fn reserved(id: u32) -> Self {
        assert!(id < FIRST_DYNAMIC_TYPE_ID);
        Self(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Structural identity of a render shape: either a Rust type or an interned
/// name for shapes not backed by a dedicated type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKey {
    Type(TypeId),
    Named(Cow<'static, str>),
}

impl ShapeKey {
    /// Keys a shape by a marker type, typically the view type the shape
    /// constructs.
    pub fn of<T: 'static>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }
}

/// Maps shape keys to monotonically assigned type ids.
///
/// Explicitly constructed and shared via `Arc` between adapters that should
/// recycle each other's targets; never an ambient global. Get-or-insert is
/// linearizable per key: concurrent first calls for an equal key observe the
/// same id. There is no removal operation.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    ids: FxHashMap<ShapeKey, RenderTypeId>,
    next: u32,
}

impl Default for RegistryInner {
    fn default() -> Self {
        Self {
            ids: FxHashMap::default(),
            next: FIRST_DYNAMIC_TYPE_ID,
        }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `key`, allocating the next integer on first sight.
    pub fn type_id_of(&self, key: &ShapeKey) -> RenderTypeId {
        let mut inner = self.inner.lock().expect("type registry poisoned");
        if let Some(id) = inner.ids.get(key) {
            return *id;
        }
        let id = RenderTypeId(inner.next);
        inner.next += 1;
        inner.ids.insert(key.clone(), id);
        id
    }

    pub fn contains(&self, key: &ShapeKey) -> bool {
        self.inner
            .lock()
            .expect("type registry poisoned")
            .ids
            .contains_key(key)
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("type registry poisoned").ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
