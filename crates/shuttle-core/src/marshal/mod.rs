//! Marshal - keyed data と型付きオブジェクトの双方向変換
//!
//! # 構成
//! - **reflect**: `Reflect` trait と `TypeDescriptor`（型ごとのフィールド宣言）
//! - **converter**: `TypeConverter` / `TypeMatcher` / `TypeRegistry`
//! - **binding**: `FieldBinding`（1 フィールド・1 方向のアクセサ）
//! - **mapper**: `Mapper` と `MapperCache`（型ごとに一度だけ構築）
//! - **marshaller**: 公開エントリポイント

pub mod binding;
pub mod converter;
pub mod error;
pub mod mapper;
pub mod marshaller;
pub mod reflect;

pub use self::binding::{Direction, FieldBinding};
pub use self::converter::{TypeConverter, TypeMatcher, TypeRegistry};
pub use self::error::{ConversionError, MarshalError};
pub use self::mapper::{Mapper, MapperCache};
pub use self::marshaller::{KeyedData, Marshaller};
pub use self::reflect::{FieldType, Reflect, TypeDescriptor, TypeIdentity};
