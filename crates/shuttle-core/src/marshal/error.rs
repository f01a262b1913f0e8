//! Marshal errors.
//!
//! - `ConversionError`: converter が raw value を受け付けなかった
//! - `MarshalError`: marshal/unmarshal 呼び出し単位のエラー（型名・フィールド名付き）

use serde_json::Value;
use thiserror::Error;

/// A raw value did not fit the declared field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

impl ConversionError {
    /// 形の不一致
    pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: value_kind(found),
        }
    }

    /// 値が不正
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Error raised by `Marshaller::marshal` / `Marshaller::unmarshal`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// The type's descriptor could not be turned into a mapper.
    #[error("cannot reflect `{type_name}`: {reason}")]
    Reflection {
        type_name: &'static str,
        reason: String,
    },

    /// A field value could not be converted.
    #[error("field `{field}` of `{type_name}`: {source}")]
    TypeConversion {
        type_name: &'static str,
        field: String,
        #[source]
        source: ConversionError,
    },
}

impl MarshalError {
    pub(crate) fn reflection(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Reflection {
            type_name,
            reason: reason.into(),
        }
    }

    pub(crate) fn conversion(
        type_name: &'static str,
        field: impl Into<String>,
        source: ConversionError,
    ) -> Self {
        Self::TypeConversion {
            type_name,
            field: field.into(),
            source,
        }
    }
}

/// Short name of a JSON value's shape, used in mismatch messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mismatch_names_the_found_shape() {
        let err = ConversionError::mismatch("int", &json!("7"));
        assert_eq!(err.to_string(), "expected int, found string");

        let err = ConversionError::mismatch("string", &json!(1.5));
        assert_eq!(err.to_string(), "expected string, found float");
    }

    #[test]
    fn test_conversion_error_carries_field_and_type() {
        let err = MarshalError::conversion(
            "demo::Info",
            "Attempt",
            ConversionError::mismatch("int", &Value::Null),
        );
        let msg = err.to_string();
        assert!(msg.contains("Attempt"));
        assert!(msg.contains("demo::Info"));
        assert!(msg.contains("found null"));
    }
}
