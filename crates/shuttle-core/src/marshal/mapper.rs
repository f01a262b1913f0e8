//! Mapper and MapperCache.
//!
//! A `Mapper<T>` is built once from `T::reflect` and is immutable afterwards.
//! The cache keeps one entry per distinct type for the lifetime of its owner.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use super::binding::{Accessor, FieldBinding};
use super::converter::TypeRegistry;
use super::error::MarshalError;
use super::reflect::{Lens, Reflect, TypeDescriptor, TypeIdentity};

/// marshal 層の tracing target
pub(crate) const MARSHAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::marshal");

/// Per-type getter/setter tables plus the copy-on-write flag.
///
/// Getters and setters may cover different field sets.
pub struct Mapper<T> {
    identity: TypeIdentity,
    getters: IndexMap<&'static str, FieldBinding<T>>,
    setters: IndexMap<&'static str, FieldBinding<T>>,
    copy_on_write: bool,
}

impl<T: Reflect> Mapper<T> {
    pub(crate) fn build(registry: &TypeRegistry) -> Result<Self, MarshalError> {
        let identity = TypeIdentity::of::<T>();
        let type_name = identity.name();

        let mut descriptor = TypeDescriptor::<T>::new();
        T::reflect(&mut descriptor);
        let (fields, copy_on_write) = descriptor.into_parts();

        let mut getters = IndexMap::new();
        let mut setters = IndexMap::new();

        for decl in fields {
            if decl.name.is_empty() {
                return Err(MarshalError::reflection(type_name, "field name is empty"));
            }
            if decl.lens == Lens::Serde && decl.ty.is_nested_object() {
                return Err(MarshalError::reflection(
                    type_name,
                    format!(
                        "field `{}` of type {} needs object, objects or optional_object",
                        decl.name, decl.ty
                    ),
                ));
            }
            if decl.read.is_none() && decl.write.is_none() {
                return Err(MarshalError::reflection(
                    type_name,
                    format!("field `{}` has neither getter nor setter", decl.name),
                ));
            }

            let converter = registry.detect(&decl.ty).ok_or_else(|| {
                MarshalError::reflection(
                    type_name,
                    format!("no converter for field `{}` of type {}", decl.name, decl.ty),
                )
            })?;

            if let Some(read) = decl.read {
                if getters.contains_key(decl.name) {
                    return Err(duplicate(type_name, decl.name));
                }
                let binding = FieldBinding::new(
                    type_name,
                    decl.name,
                    Accessor::Get(read),
                    Arc::clone(&converter),
                );
                getters.insert(decl.name, binding);
            }

            if let Some(write) = decl.write {
                if setters.contains_key(decl.name) {
                    return Err(duplicate(type_name, decl.name));
                }
                let binding =
                    FieldBinding::new(type_name, decl.name, Accessor::Set(write), converter);
                setters.insert(decl.name, binding);
            }
        }

        Ok(Self {
            identity,
            getters,
            setters,
            copy_on_write,
        })
    }
}

impl<T> Mapper<T> {
    /// 対象型の identity
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// 宣言順の getter
    pub fn getters(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.getters.values()
    }

    /// 宣言順の setter
    pub fn setters(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.setters.values()
    }

    pub fn getter(&self, field: &str) -> Option<&FieldBinding<T>> {
        self.getters.get(field)
    }

    pub fn setter(&self, field: &str) -> Option<&FieldBinding<T>> {
        self.setters.get(field)
    }

    /// unmarshal が複製を返すか
    pub fn is_copy_on_write(&self) -> bool {
        self.copy_on_write
    }
}

fn duplicate(type_name: &'static str, field: &str) -> MarshalError {
    MarshalError::reflection(type_name, format!("field `{field}` is declared twice"))
}

type ErasedMapper = Arc<dyn Any + Send + Sync>;

/// Lazily built, never evicted mapper table keyed by type identity.
///
/// Concurrent first use may build the same mapper twice; the first insert wins
/// and the loser is dropped. Mappers are immutable so either copy is valid.
pub struct MapperCache {
    registry: TypeRegistry,
    mappers: RwLock<HashMap<TypeIdentity, ErasedMapper>>,
}

impl MapperCache {
    /// 空のキャッシュを作成
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            mappers: RwLock::new(HashMap::new()),
        }
    }

    /// Mapper を取得（初回のみ構築）
    pub fn get<T: Reflect>(&self) -> Result<Arc<Mapper<T>>, MarshalError> {
        let identity = TypeIdentity::of::<T>();

        let cached = self.mappers.read().get(&identity).cloned();
        let erased = match cached {
            Some(erased) => erased,
            None => {
                let built: ErasedMapper = Arc::new(Mapper::<T>::build(&self.registry)?);
                trace!(target: MARSHAL_TARGET, type_name = identity.name(), "built mapper");
                Arc::clone(self.mappers.write().entry(identity).or_insert(built))
            }
        };

        erased.downcast::<Mapper<T>>().map_err(|_| {
            MarshalError::reflection(identity.name(), "cached mapper has a different type")
        })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.mappers.read().contains_key(&TypeIdentity::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.mappers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.read().is_empty()
    }
}

impl Default for MapperCache {
    fn default() -> Self {
        Self::new(TypeRegistry::default())
    }
}

impl std::fmt::Debug for MapperCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperCache")
            .field("registry", &self.registry)
            .field("mappers", &self.len())
            .finish()
    }
}
