//! TypeConverter - 宣言型ごとの値変換
//!
//! Converter は wire 上の raw value と、アクセサが serde で扱う
//! in-process 表現（canonical value）の間を変換します。
//!
//! # 解決順序
//! - ユーザー指定の `TypeMatcher` を登録順に試す（最初にマッチしたものを採用）
//! - どれもマッチしなければ組み込み matcher
//! - それでも見つからなければ Mapper 構築は ReflectionFailure

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::error::ConversionError;
use super::reflect::{FieldType, TypeIdentity};

/// Transcodes one declared field type between wire and in-process form.
pub trait TypeConverter: fmt::Debug + Send + Sync {
    /// In-process (canonical) value to wire value. Used by marshal.
    fn serialize(&self, value: Value) -> Result<Value, ConversionError>;

    /// Wire value to in-process (canonical) value. Used by unmarshal.
    fn parse(&self, raw: Value) -> Result<Value, ConversionError>;
}

/// Decides whether it can handle a declared field type.
///
/// `registry` is passed so composite types can resolve their element types
/// with the same priority order.
pub trait TypeMatcher: Send + Sync {
    fn resolve(&self, ty: &FieldType, registry: &TypeRegistry) -> Option<Arc<dyn TypeConverter>>;
}

impl<F> TypeMatcher for F
where
    F: Fn(&FieldType, &TypeRegistry) -> Option<Arc<dyn TypeConverter>> + Send + Sync,
{
    fn resolve(&self, ty: &FieldType, registry: &TypeRegistry) -> Option<Arc<dyn TypeConverter>> {
        self(ty, registry)
    }
}

/// Ordered list of matchers: user matchers first, built-ins last.
pub struct TypeRegistry {
    matchers: Vec<Arc<dyn TypeMatcher>>,
}

impl TypeRegistry {
    /// ユーザー matcher を優先するレジストリを作成
    pub fn new(matchers: Vec<Arc<dyn TypeMatcher>>) -> Self {
        let mut all = matchers;
        all.push(Arc::new(BuiltinMatcher));
        Self { matchers: all }
    }

    /// 宣言型に合うコンバータを探す（ユーザー matcher → 組み込み）
    pub fn detect(&self, ty: &FieldType) -> Option<Arc<dyn TypeConverter>> {
        self.matchers
            .iter()
            .find_map(|matcher| matcher.resolve(ty, self))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}

struct BuiltinMatcher;

impl TypeMatcher for BuiltinMatcher {
    fn resolve(&self, ty: &FieldType, registry: &TypeRegistry) -> Option<Arc<dyn TypeConverter>> {
        let converter: Arc<dyn TypeConverter> = match ty {
            FieldType::Bool => Arc::new(ScalarConverter(Scalar::Bool)),
            FieldType::Int => Arc::new(ScalarConverter(Scalar::Int)),
            FieldType::Float => Arc::new(ScalarConverter(Scalar::Float)),
            FieldType::String => Arc::new(ScalarConverter(Scalar::String)),
            FieldType::Any => Arc::new(AnyConverter),
            FieldType::DateTime => Arc::new(DateTimeConverter),
            FieldType::Duration => Arc::new(DurationConverter),
            FieldType::Enum(variants) => Arc::new(EnumConverter {
                variants: *variants,
            }),
            FieldType::Object(identity) => Arc::new(ObjectConverter {
                identity: *identity,
            }),
            FieldType::Array(inner) => Arc::new(ArrayConverter {
                inner: registry.detect(inner)?,
            }),
            FieldType::Nullable(inner) => Arc::new(NullableConverter {
                inner: registry.detect(inner)?,
            }),
            FieldType::Named(_) => return None,
        };
        Some(converter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Bool,
    Int,
    Float,
    String,
}

impl Scalar {
    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::String => value.is_string(),
        }
    }
}

/// Shape-checked pass-through.
#[derive(Debug)]
struct ScalarConverter(Scalar);

impl ScalarConverter {
    fn check(&self, value: Value) -> Result<Value, ConversionError> {
        if self.0.accepts(&value) {
            Ok(value)
        } else {
            Err(ConversionError::mismatch(self.0.name(), &value))
        }
    }
}

impl TypeConverter for ScalarConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        self.check(value)
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        self.check(raw)
    }
}

#[derive(Debug)]
struct AnyConverter;

impl TypeConverter for AnyConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        Ok(value)
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        Ok(raw)
    }
}

/// Wire: RFC 3339 string (or integer Unix seconds on input).
#[derive(Debug)]
struct DateTimeConverter;

impl DateTimeConverter {
    fn format(time: DateTime<Utc>) -> Value {
        Value::String(time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn from_rfc3339(text: &str) -> Result<DateTime<Utc>, ConversionError> {
        DateTime::parse_from_rfc3339(text)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|e| ConversionError::invalid(format!("invalid datetime `{text}`: {e}")))
    }
}

impl TypeConverter for DateTimeConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        match &value {
            Value::String(text) => Self::from_rfc3339(text).map(Self::format),
            other => Err(ConversionError::mismatch("datetime", other)),
        }
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        match &raw {
            Value::String(text) => Self::from_rfc3339(text).map(Self::format),
            Value::Number(n) => {
                let seconds = n
                    .as_i64()
                    .ok_or_else(|| ConversionError::mismatch("datetime", &raw))?;
                DateTime::<Utc>::from_timestamp(seconds, 0)
                    .map(Self::format)
                    .ok_or_else(|| {
                        ConversionError::invalid(format!("timestamp {seconds} is out of range"))
                    })
            }
            other => Err(ConversionError::mismatch("datetime", other)),
        }
    }
}

/// Wire: integer nanoseconds. In-process: serde form of `std::time::Duration`.
#[derive(Debug)]
struct DurationConverter;

impl TypeConverter for DurationConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        let duration: Duration = serde_json::from_value(value)
            .map_err(|e| ConversionError::invalid(format!("invalid duration: {e}")))?;
        let nanos = u64::try_from(duration.as_nanos())
            .map_err(|_| ConversionError::invalid("duration does not fit in u64 nanoseconds"))?;
        Ok(Value::from(nanos))
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        let nanos = raw
            .as_u64()
            .ok_or_else(|| ConversionError::mismatch("duration (nanoseconds)", &raw))?;
        serde_json::to_value(Duration::from_nanos(nanos))
            .map_err(|e| ConversionError::invalid(e.to_string()))
    }
}

/// Wire: variant name (any case) or ordinal. Canonical: declared variant name.
#[derive(Debug)]
struct EnumConverter {
    variants: &'static [&'static str],
}

impl EnumConverter {
    fn expected(&self) -> String {
        format!("one of {}", self.variants.join(", "))
    }

    fn by_name(&self, name: &str) -> Option<&'static str> {
        self.variants
            .iter()
            .copied()
            .find(|variant| variant.eq_ignore_ascii_case(name))
    }
}

impl TypeConverter for EnumConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        match &value {
            Value::String(name) if self.variants.contains(&name.as_str()) => Ok(value),
            other => Err(ConversionError::mismatch(self.expected(), other)),
        }
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        let variant = match &raw {
            Value::String(name) => self.by_name(name),
            Value::Number(n) => n
                .as_u64()
                .and_then(|ordinal| usize::try_from(ordinal).ok())
                .and_then(|ordinal| self.variants.get(ordinal).copied()),
            _ => None,
        };
        variant
            .map(Value::from)
            .ok_or_else(|| ConversionError::mismatch(self.expected(), &raw))
    }
}

/// Keyed data for a nested `Reflect` type. Field handling is the nested mapper's job.
#[derive(Debug)]
struct ObjectConverter {
    identity: TypeIdentity,
}

impl ObjectConverter {
    fn check(&self, value: Value) -> Result<Value, ConversionError> {
        if value.is_object() {
            Ok(value)
        } else {
            Err(ConversionError::mismatch(
                format!("object<{}>", self.identity),
                &value,
            ))
        }
    }
}

impl TypeConverter for ObjectConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        self.check(value)
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        self.check(raw)
    }
}

#[derive(Debug)]
struct ArrayConverter {
    inner: Arc<dyn TypeConverter>,
}

impl ArrayConverter {
    fn each(
        &self,
        value: Value,
        convert: impl Fn(&dyn TypeConverter, Value) -> Result<Value, ConversionError>,
    ) -> Result<Value, ConversionError> {
        let Value::Array(items) = value else {
            return Err(ConversionError::mismatch("array", &value));
        };
        items
            .into_iter()
            .map(|item| convert(self.inner.as_ref(), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl TypeConverter for ArrayConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        self.each(value, |inner, item| inner.serialize(item))
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        self.each(raw, |inner, item| inner.parse(item))
    }
}

#[derive(Debug)]
struct NullableConverter {
    inner: Arc<dyn TypeConverter>,
}

impl TypeConverter for NullableConverter {
    fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
        if value.is_null() {
            Ok(value)
        } else {
            self.inner.serialize(value)
        }
    }

    fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
        if raw.is_null() {
            Ok(raw)
        } else {
            self.inner.parse(raw)
        }
    }
}
