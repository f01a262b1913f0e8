//! Reflect - 型ごとのフィールド記述
//!
//! Rust には実行時リフレクションがないので、型は `Reflect` を実装して
//! 自分のフィールド（名前・宣言型・アクセサ）を `TypeDescriptor` に登録します。
//! `MapperCache` はこの記述を型ごとに一度だけ読み、`Mapper` にしてキャッシュします。
//!
//! # 使用例
//! ```ignore
//! #[derive(Debug, Clone, Default)]
//! struct Greeting {
//!     name: String,
//!     sent_at: DateTime<Utc>,
//! }
//!
//! impl Reflect for Greeting {
//!     fn reflect(d: &mut TypeDescriptor<Self>) {
//!         d.field("name", FieldType::String, |g| &g.name, |g| &mut g.name);
//!         d.field("sentAt", FieldType::DateTime, |g| &g.sent_at, |g| &mut g.sent_at);
//!     }
//! }
//! ```

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ConversionError, MarshalError};
use super::marshaller::Marshaller;

/// Stable identity of an in-process type; the mapper cache key.
#[derive(Debug, Clone, Copy)]
pub struct TypeIdentity {
    id: TypeId,
    name: &'static str,
}

impl TypeIdentity {
    /// 型 T の identity
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 型名
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declared type of a field. Converters are selected by matching on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
    /// Any JSON value, passed through untouched.
    Any,
    /// `chrono::DateTime<Utc>`.
    DateTime,
    /// `std::time::Duration`.
    Duration,
    /// Unit-variant enum; the slice lists the canonical variant names in ordinal order.
    Enum(&'static [&'static str]),
    /// Nested `Reflect` type.
    Object(TypeIdentity),
    Array(Box<FieldType>),
    Nullable(Box<FieldType>),
    /// Application-defined type. Only user matchers can resolve it.
    Named(&'static str),
}

impl FieldType {
    /// 配列型
    pub fn array(inner: FieldType) -> Self {
        Self::Array(Box::new(inner))
    }

    /// null 許容型
    pub fn nullable(inner: FieldType) -> Self {
        Self::Nullable(Box::new(inner))
    }

    /// ネストした Reflect 型
    pub fn object<T: 'static>() -> Self {
        Self::Object(TypeIdentity::of::<T>())
    }

    /// `true` for `Object`, and for `Array`/`Nullable` wrapping one.
    pub fn is_nested_object(&self) -> bool {
        match self {
            Self::Object(_) => true,
            Self::Array(inner) | Self::Nullable(inner) => inner.is_nested_object(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Any => f.write_str("any"),
            Self::DateTime => f.write_str("datetime"),
            Self::Duration => f.write_str("duration"),
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
            Self::Object(identity) => write!(f, "object<{identity}>"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Nullable(inner) => write!(f, "nullable<{inner}>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A type that can be marshalled to and from keyed data.
///
/// `reflect` is called once per type per `Marshaller`; the result is cached.
pub trait Reflect: Clone + Send + Sync + 'static {
    fn reflect(descriptor: &mut TypeDescriptor<Self>);
}

pub(crate) type ReadFn<T> =
    Box<dyn Fn(&T, &Marshaller) -> Result<Value, MarshalError> + Send + Sync>;
pub(crate) type WriteFn<T> =
    Box<dyn Fn(&mut T, Value, &Marshaller) -> Result<(), MarshalError> + Send + Sync>;

/// One declared field, before converter resolution.
pub(crate) struct FieldDecl<T> {
    pub(crate) name: &'static str,
    pub(crate) ty: FieldType,
    pub(crate) lens: Lens,
    pub(crate) read: Option<ReadFn<T>>,
    pub(crate) write: Option<WriteFn<T>>,
}

/// How a declared field reaches its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lens {
    /// Leaf value round-tripped through serde.
    Serde,
    /// Nested `Reflect` type, handled by its own mapper.
    Mapper,
}

/// Field table filled in by `Reflect::reflect`.
pub struct TypeDescriptor<T> {
    fields: Vec<FieldDecl<T>>,
    copy_on_write: bool,
}

impl<T: 'static> TypeDescriptor<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            copy_on_write: false,
        }
    }

    /// Readable and writable field.
    pub fn field<F>(
        &mut self,
        name: &'static str,
        ty: FieldType,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut Self
    where
        F: Serialize + DeserializeOwned + 'static,
    {
        self.push(
            name,
            ty,
            Lens::Serde,
            Some(read_value(name, get)),
            Some(write_value(name, get_mut)),
        )
    }

    /// Read-only field: marshalled, never written by unmarshal.
    pub fn getter<F>(&mut self, name: &'static str, ty: FieldType, get: fn(&T) -> &F) -> &mut Self
    where
        F: Serialize + 'static,
    {
        self.push(name, ty, Lens::Serde, Some(read_value(name, get)), None)
    }

    /// Write-only field: accepted by unmarshal, never emitted by marshal.
    pub fn setter<F>(
        &mut self,
        name: &'static str,
        ty: FieldType,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut Self
    where
        F: DeserializeOwned + 'static,
    {
        self.push(name, ty, Lens::Serde, None, Some(write_value(name, get_mut)))
    }

    /// Nested object, marshalled through its own mapper.
    pub fn object<N>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &N,
        get_mut: fn(&mut T) -> &mut N,
    ) -> &mut Self
    where
        N: Reflect,
    {
        let read: ReadFn<T> =
            Box::new(move |target, marshaller| marshaller.marshal(get(target)).map(Value::Object));

        let write: WriteFn<T> = Box::new(move |target, value, marshaller| {
            let Value::Object(data) = value else {
                return Err(MarshalError::conversion(
                    std::any::type_name::<T>(),
                    name,
                    ConversionError::mismatch("object", &value),
                ));
            };
            let slot = get_mut(target);
            let replacement = match marshaller.unmarshal(&data, &mut *slot)? {
                Cow::Owned(updated) => Some(updated),
                Cow::Borrowed(_) => None,
            };
            if let Some(updated) = replacement {
                *slot = updated;
            }
            Ok(())
        });

        self.push(name, FieldType::object::<N>(), Lens::Mapper, Some(read), Some(write))
    }

    /// Collection of nested objects. Unmarshal rebuilds the collection from defaults.
    pub fn objects<N>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &Vec<N>,
        get_mut: fn(&mut T) -> &mut Vec<N>,
    ) -> &mut Self
    where
        N: Reflect + Default,
    {
        let read: ReadFn<T> = Box::new(move |target, marshaller| {
            get(target)
                .iter()
                .map(|item| marshaller.marshal(item).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        });

        let write: WriteFn<T> = Box::new(move |target, value, marshaller| {
            let mismatch = |found: &Value| {
                MarshalError::conversion(
                    std::any::type_name::<T>(),
                    name,
                    ConversionError::mismatch("array of objects", found),
                )
            };
            let Value::Array(items) = value else {
                return Err(mismatch(&value));
            };
            let mut decoded = Vec::with_capacity(items.len());
            for item in items {
                let Value::Object(data) = item else {
                    return Err(mismatch(&item));
                };
                decoded.push(marshaller.decode::<N>(&data)?);
            }
            *get_mut(target) = decoded;
            Ok(())
        });

        self.push(
            name,
            FieldType::array(FieldType::object::<N>()),
            Lens::Mapper,
            Some(read),
            Some(write),
        )
    }

    /// Optional nested object. `null` clears the field; an object updates the
    /// present value in place or decodes a fresh one.
    pub fn optional_object<N>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &Option<N>,
        get_mut: fn(&mut T) -> &mut Option<N>,
    ) -> &mut Self
    where
        N: Reflect + Default,
    {
        let read: ReadFn<T> = Box::new(move |target, marshaller| match get(target) {
            Some(nested) => marshaller.marshal(nested).map(Value::Object),
            None => Ok(Value::Null),
        });

        let write: WriteFn<T> = Box::new(move |target, value, marshaller| {
            let data = match value {
                Value::Null => {
                    *get_mut(target) = None;
                    return Ok(());
                }
                Value::Object(data) => data,
                other => {
                    return Err(MarshalError::conversion(
                        std::any::type_name::<T>(),
                        name,
                        ConversionError::mismatch("object or null", &other),
                    ));
                }
            };
            let slot = get_mut(target);
            let replacement = match slot.as_mut() {
                Some(current) => match marshaller.unmarshal(&data, current)? {
                    Cow::Owned(updated) => Some(updated),
                    Cow::Borrowed(_) => None,
                },
                None => Some(marshaller.decode::<N>(&data)?),
            };
            if let Some(updated) = replacement {
                *slot = Some(updated);
            }
            Ok(())
        });

        self.push(
            name,
            FieldType::nullable(FieldType::object::<N>()),
            Lens::Mapper,
            Some(read),
            Some(write),
        )
    }

    /// Unmarshal works on a clone and leaves the caller's instance untouched.
    pub fn copy_on_write(&mut self) -> &mut Self {
        self.copy_on_write = true;
        self
    }

    fn push(
        &mut self,
        name: &'static str,
        ty: FieldType,
        lens: Lens,
        read: Option<ReadFn<T>>,
        write: Option<WriteFn<T>>,
    ) -> &mut Self {
        self.fields.push(FieldDecl {
            name,
            ty,
            lens,
            read,
            write,
        });
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<FieldDecl<T>>, bool) {
        (self.fields, self.copy_on_write)
    }
}

fn read_value<T: 'static, F: Serialize + 'static>(
    name: &'static str,
    get: fn(&T) -> &F,
) -> ReadFn<T> {
    Box::new(move |target, _| {
        serde_json::to_value(get(target)).map_err(|e| {
            MarshalError::conversion(
                std::any::type_name::<T>(),
                name,
                ConversionError::invalid(e.to_string()),
            )
        })
    })
}

fn write_value<T: 'static, F: DeserializeOwned + 'static>(
    name: &'static str,
    get_mut: fn(&mut T) -> &mut F,
) -> WriteFn<T> {
    Box::new(move |target, value, _| {
        let decoded = serde_json::from_value::<F>(value).map_err(|e| {
            MarshalError::conversion(
                std::any::type_name::<T>(),
                name,
                ConversionError::invalid(e.to_string()),
            )
        })?;
        *get_mut(target) = decoded;
        Ok(())
    })
}
