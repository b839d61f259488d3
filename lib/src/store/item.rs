use std::fmt;
use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use derive_more::{Debug, Deref, From};

use crate::error::Result;
use crate::store::Meta;
use crate::util::Deferred;

/// Identifies the Rust type of an item's computed value.
#[derive(Copy, Clone)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        TypeTag { id: TypeId::of::<T>(), name: std::any::type_name::<T>() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag { }

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased, shareable value with its [`TypeTag`].
#[derive(Clone, Debug)]
#[debug("Data<{}>", tag.name)]
pub struct Data {
    tag: TypeTag,
    value: Arc<dyn Any + Send + Sync>,
}

impl Data {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Data { tag: TypeTag::of::<T>(), value: Arc::new(value) }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is<T: Any>(&self) -> bool {
        self.tag == TypeTag::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast().ok()
    }
}

/// Raw bytes: the value of every item read from disk, and of every item no
/// parser could handle.
#[derive(Clone, PartialEq, Eq, Debug, Deref, From)]
#[debug("Binary({} bytes)", _0.len())]
pub struct Binary(pub Arc<[u8]>);

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary(bytes.into())
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Binary(bytes.into())
    }
}

/// A content item: metadata and a lazily computed, memoized value.
#[derive(Clone, Debug)]
pub struct Item {
    meta: Meta,
    value: Deferred<Data>,
}

impl Item {
    pub fn new(meta: Meta, value: Deferred<Data>) -> Self {
        Item { meta, value }
    }

    /// An item whose value is computed by `f` the first time it is needed.
    pub fn lazy<T, F>(meta: Meta, f: F) -> Self
        where T: Any + Send + Sync, F: FnOnce() -> Result<T> + Send + 'static
    {
        Item::new(meta, Deferred::new(move || f().map(Data::new)))
    }

    /// An item with an already computed value.
    pub fn ready<T: Any + Send + Sync>(meta: Meta, value: T) -> Self {
        Item::new(meta, Deferred::ready(Data::new(value)))
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn value(&self) -> &Deferred<Data> {
        &self.value
    }

    /// Forces the value.
    pub fn data(&self) -> Result<&Data> {
        self.value.force()
    }

    pub fn tag(&self) -> Result<TypeTag> {
        self.data().map(|data| data.tag())
    }

    /// `true` if the value computes successfully and is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.force_ref().map_or(false, |data| data.is::<T>())
    }

    /// Forces the value and downcasts it to `T`.
    pub fn read<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let data = self.data()?;
        data.downcast::<T>().ok_or_else(|| error! {
            "item value has an unexpected type",
            "expected" => std::any::type_name::<T>(),
            "actual" => data.tag().name(),
        })
    }

    /// The same value under new metadata.
    pub fn with_meta(&self, meta: Meta) -> Item {
        Item { meta, value: self.value.clone() }
    }
}
