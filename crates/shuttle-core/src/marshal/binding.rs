//! FieldBinding - 1 フィールド・1 方向のアクセサ
//!
//! Mapper が排他的に所有します。型をまたいで共有されることはありません。

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::converter::TypeConverter;
use super::error::MarshalError;
use super::marshaller::Marshaller;
use super::reflect::{ReadFn, WriteFn};

/// アクセサの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Set,
}

pub(crate) enum Accessor<T> {
    Get(ReadFn<T>),
    Set(WriteFn<T>),
}

/// A named getter or setter bound to one field of `T`, plus its converter.
pub struct FieldBinding<T> {
    type_name: &'static str,
    field: &'static str,
    accessor: Accessor<T>,
    converter: Arc<dyn TypeConverter>,
}

impl<T> FieldBinding<T> {
    /// FieldBinding を作成
    pub(crate) fn new(
        type_name: &'static str,
        field: &'static str,
        accessor: Accessor<T>,
        converter: Arc<dyn TypeConverter>,
    ) -> Self {
        Self {
            type_name,
            field,
            accessor,
            converter,
        }
    }

    /// フィールド名
    pub fn name(&self) -> &'static str {
        self.field
    }

    /// 向き
    pub fn direction(&self) -> Direction {
        match self.accessor {
            Accessor::Get(_) => Direction::Get,
            Accessor::Set(_) => Direction::Set,
        }
    }

    /// 使用するコンバータ
    pub fn converter(&self) -> &dyn TypeConverter {
        self.converter.as_ref()
    }

    /// Reads the field and converts it to its wire form.
    pub(crate) fn get(&self, from: &T, marshaller: &Marshaller) -> Result<Value, MarshalError> {
        let Accessor::Get(read) = &self.accessor else {
            return Err(self.wrong_direction(Direction::Get));
        };
        let value = read(from, marshaller)?;
        self.converter
            .serialize(value)
            .map_err(|e| MarshalError::conversion(self.type_name, self.field, e))
    }

    /// Converts a wire value and writes it to the field.
    pub(crate) fn set(
        &self,
        to: &mut T,
        raw: Value,
        marshaller: &Marshaller,
    ) -> Result<(), MarshalError> {
        let Accessor::Set(write) = &self.accessor else {
            return Err(self.wrong_direction(Direction::Set));
        };
        let value = self
            .converter
            .parse(raw)
            .map_err(|e| MarshalError::conversion(self.type_name, self.field, e))?;
        write(to, value, marshaller)
    }

    fn wrong_direction(&self, wanted: Direction) -> MarshalError {
        MarshalError::reflection(
            self.type_name,
            format!("field `{}` has no {wanted:?} accessor", self.field),
        )
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("direction", &self.direction())
            .field("converter", &self.converter)
            .finish()
    }
}
