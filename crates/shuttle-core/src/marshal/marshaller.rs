//! Marshaller - keyed data と型付きオブジェクトの相互変換
//!
//! # フロー
//! - marshal: Mapper の getter を順に呼び、converter で wire 形式にして詰める
//! - unmarshal: copy-on-write 型なら clone に対して、そうでなければ target に直接
//!   setter を適用する。キーが「存在する」フィールドだけが対象（null でも適用）

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::converter::{TypeMatcher, TypeRegistry};
use super::error::MarshalError;
use super::mapper::{Mapper, MapperCache};
use super::reflect::Reflect;

/// Wire-adjacent representation: field name to arbitrary value.
pub type KeyedData = Map<String, Value>;

/// keyed data と Reflect 型の双方向変換
#[derive(Debug, Default)]
pub struct Marshaller {
    mappers: MapperCache,
}

impl Marshaller {
    /// `matchers` are tried in order before the built-in converters.
    pub fn new(matchers: Vec<Arc<dyn TypeMatcher>>) -> Self {
        Self {
            mappers: MapperCache::new(TypeRegistry::new(matchers)),
        }
    }

    /// Mapper キャッシュ
    pub fn mappers(&self) -> &MapperCache {
        &self.mappers
    }

    /// オブジェクトを keyed data に変換
    pub fn marshal<T: Reflect>(&self, from: &T) -> Result<KeyedData, MarshalError> {
        let mapper = self.mappers.get::<T>()?;

        let mut result = KeyedData::new();
        for getter in mapper.getters() {
            result.insert(getter.name().to_owned(), getter.get(from, self)?);
        }
        Ok(result)
    }

    /// Applies `from` to `to`.
    ///
    /// Copy-on-write types come back as `Cow::Owned` and `to` is left untouched;
    /// other types are updated in place and come back as `Cow::Borrowed`.
    pub fn unmarshal<'a, T: Reflect>(
        &self,
        from: &KeyedData,
        to: &'a mut T,
    ) -> Result<Cow<'a, T>, MarshalError> {
        let mapper = self.mappers.get::<T>()?;

        if mapper.is_copy_on_write() {
            let mut copy = to.clone();
            self.apply(&mapper, from, &mut copy)?;
            return Ok(Cow::Owned(copy));
        }

        self.apply(&mapper, from, to)?;
        Ok(Cow::Borrowed(to))
    }

    /// Unmarshals into a fresh `T::default()`.
    pub fn decode<T: Reflect + Default>(&self, from: &KeyedData) -> Result<T, MarshalError> {
        let mut target = T::default();
        let updated = match self.unmarshal(from, &mut target)? {
            Cow::Owned(updated) => Some(updated),
            Cow::Borrowed(_) => None,
        };
        Ok(updated.unwrap_or(target))
    }

    fn apply<T>(
        &self,
        mapper: &Mapper<T>,
        from: &KeyedData,
        to: &mut T,
    ) -> Result<(), MarshalError> {
        for setter in mapper.setters() {
            let Some(raw) = from.get(setter.name()) else {
                continue;
            };
            setter.set(to, raw.clone(), self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::reflect::{FieldType, TypeDescriptor};
    use crate::marshal::{ConversionError, TypeConverter};
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    enum Priority {
        #[default]
        Low,
        High,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Owner {
        name: String,
    }

    impl Reflect for Owner {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.field("Name", FieldType::String, |o| &o.name, |o| &mut o.name);
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ticket {
        id: i64,
        title: Option<String>,
        priority: Priority,
        due: DateTime<Utc>,
        timeout: Duration,
        owner: Owner,
        watchers: Vec<Owner>,
    }

    impl Reflect for Ticket {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.field("id", FieldType::Int, |t| &t.id, |t| &mut t.id)
                .field(
                    "title",
                    FieldType::nullable(FieldType::String),
                    |t| &t.title,
                    |t| &mut t.title,
                )
                .field(
                    "priority",
                    FieldType::Enum(&["Low", "High"]),
                    |t| &t.priority,
                    |t| &mut t.priority,
                )
                .field("due", FieldType::DateTime, |t| &t.due, |t| &mut t.due)
                .field("timeout", FieldType::Duration, |t| &t.timeout, |t| &mut t.timeout)
                .object("owner", |t| &t.owner, |t| &mut t.owner)
                .objects("watchers", |t| &t.watchers, |t| &mut t.watchers);
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Snapshot {
        label: String,
        count: i64,
    }

    impl Reflect for Snapshot {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.field("label", FieldType::String, |s| &s.label, |s| &mut s.label)
                .field("count", FieldType::Int, |s| &s.count, |s| &mut s.count)
                .copy_on_write();
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            id: 7,
            title: Some("fix the loom".to_owned()),
            priority: Priority::High,
            due: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            timeout: Duration::from_millis(1500),
            owner: Owner {
                name: "kai".to_owned(),
            },
            watchers: vec![Owner {
                name: "rin".to_owned(),
            }],
        }
    }

    #[test]
    fn test_marshal_produces_wire_shapes() {
        let marshaller = Marshaller::default();
        let data = marshaller.marshal(&ticket()).unwrap();

        assert_eq!(
            Value::Object(data),
            json!({
                "id": 7,
                "title": "fix the loom",
                "priority": "High",
                "due": "2024-05-01T09:30:00Z",
                "timeout": 1_500_000_000u64,
                "owner": {"Name": "kai"},
                "watchers": [{"Name": "rin"}],
            })
        );
    }

    #[test]
    fn test_round_trip_is_a_no_op() {
        let marshaller = Marshaller::default();
        let original = ticket();
        let data = marshaller.marshal(&original).unwrap();

        let mut target = original.clone();
        let result = marshaller.unmarshal(&data, &mut target).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(*result, original);
    }

    #[test]
    fn test_unmarshal_converts_wire_values() {
        let marshaller = Marshaller::default();
        let data = json!({
            "priority": 1,
            "due": 0,
            "timeout": 2_000_000_000u64,
            "owner": {"Name": "sora"},
        });
        let Value::Object(data) = data else { unreachable!() };

        let decoded: Ticket = marshaller.decode(&data).unwrap();
        assert_eq!(decoded.priority, Priority::High);
        assert_eq!(decoded.due, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(decoded.timeout, Duration::from_secs(2));
        assert_eq!(decoded.owner.name, "sora");
    }

    #[test]
    fn test_present_null_differs_from_absent_key() {
        let marshaller = Marshaller::default();

        let mut cleared = ticket();
        let Value::Object(with_null) = json!({"title": null}) else { unreachable!() };
        marshaller.unmarshal(&with_null, &mut cleared).unwrap();
        assert_eq!(cleared.title, None);

        let mut kept = ticket();
        marshaller.unmarshal(&KeyedData::new(), &mut kept).unwrap();
        assert_eq!(kept.title.as_deref(), Some("fix the loom"));
    }

    #[test]
    fn test_copy_on_write_leaves_original_untouched() {
        let marshaller = Marshaller::default();
        let mut original = Snapshot {
            label: "before".to_owned(),
            count: 1,
        };
        let Value::Object(data) = json!({"label": "after"}) else { unreachable!() };

        let result = marshaller.unmarshal(&data, &mut original).unwrap();
        let Cow::Owned(updated) = result else {
            panic!("copy-on-write type must yield a new instance");
        };
        assert_eq!(updated.label, "after");
        assert_eq!(updated.count, 1);
        assert_eq!(original.label, "before");
    }

    #[test]
    fn test_copy_on_write_failure_does_not_corrupt_original() {
        let marshaller = Marshaller::default();
        let mut original = Snapshot {
            label: "before".to_owned(),
            count: 1,
        };
        let Value::Object(data) = json!({"label": "after", "count": "many"}) else {
            unreachable!()
        };

        let err = marshaller.unmarshal(&data, &mut original).unwrap_err();
        assert!(matches!(err, MarshalError::TypeConversion { ref field, .. } if field == "count"));
        assert_eq!(original.label, "before");
    }

    #[test]
    fn test_incompatible_values_fail_with_type_conversion() {
        let marshaller = Marshaller::default();
        let Value::Object(data) = json!({"owner": "nobody"}) else { unreachable!() };

        let err = marshaller.decode::<Ticket>(&data).unwrap_err();
        assert!(matches!(err, MarshalError::TypeConversion { ref field, .. } if field == "owner"));
    }

    #[derive(Debug, Clone, Default)]
    struct Counted {
        n: i64,
    }

    static COUNTED_REFLECTIONS: AtomicUsize = AtomicUsize::new(0);

    impl Reflect for Counted {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            COUNTED_REFLECTIONS.fetch_add(1, Ordering::SeqCst);
            d.field("n", FieldType::Int, |c| &c.n, |c| &mut c.n);
        }
    }

    #[test]
    fn test_reflection_runs_once_per_type() {
        let marshaller = Marshaller::default();

        marshaller.marshal(&Counted::default()).unwrap();
        marshaller.marshal(&Counted { n: 2 }).unwrap();
        let mut target = Counted::default();
        marshaller.unmarshal(&KeyedData::new(), &mut target).unwrap();
        assert_eq!(COUNTED_REFLECTIONS.load(Ordering::SeqCst), 1);

        marshaller.marshal(&ticket()).unwrap();

        // Counted, Ticket, Owner and Snapshot each get their own entry.
        marshaller.marshal(&Snapshot::default()).unwrap();
        assert_eq!(marshaller.mappers().len(), 4);
    }

    #[derive(Debug)]
    struct Shout;

    impl TypeConverter for Shout {
        fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
            let text = value.as_str().unwrap_or_default().to_uppercase();
            Ok(Value::from(text))
        }

        fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
            let text = raw
                .as_str()
                .ok_or_else(|| ConversionError::mismatch("string", &raw))?;
            Ok(Value::from(text.to_lowercase()))
        }
    }

    #[test]
    fn test_custom_matcher_overrides_builtin_for_a_field() {
        let matcher: Arc<dyn TypeMatcher> =
            Arc::new(|ty: &FieldType, _: &TypeRegistry| -> Option<Arc<dyn TypeConverter>> {
                match ty {
                    FieldType::String => Some(Arc::new(Shout)),
                    _ => None,
                }
            });
        let marshaller = Marshaller::new(vec![matcher]);

        let data = marshaller.marshal(&Owner { name: "kai".to_owned() }).unwrap();
        assert_eq!(data["Name"], json!("KAI"));

        let owner: Owner = marshaller.decode(&data).unwrap();
        assert_eq!(owner.name, "kai");
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Lease {
        timeout: Duration,
    }

    impl Reflect for Lease {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.field("timeout", FieldType::Duration, |l| &l.timeout, |l| &mut l.timeout);
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Holder {
        current: Lease,
        previous: Option<Lease>,
    }

    impl Reflect for Holder {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.object("current", |h| &h.current, |h| &mut h.current)
                .optional_object("previous", |h| &h.previous, |h| &mut h.previous);
        }
    }

    #[test]
    fn test_optional_object_uses_the_nested_mapper() {
        let marshaller = Marshaller::default();
        let lease = Lease {
            timeout: Duration::from_secs(1),
        };
        let holder = Holder {
            current: lease.clone(),
            previous: Some(lease),
        };

        let data = marshaller.marshal(&holder).unwrap();
        assert_eq!(data["previous"], data["current"]);
        assert_eq!(data["previous"], json!({"timeout": 1_000_000_000u64}));

        let empty = marshaller.marshal(&Holder::default()).unwrap();
        assert_eq!(empty["previous"], Value::Null);
    }

    #[test]
    fn test_optional_object_unmarshal_decodes_updates_and_clears() {
        let marshaller = Marshaller::default();
        let mut holder = Holder::default();

        let Value::Object(data) = json!({"previous": {"timeout": 2_000_000_000u64}}) else {
            unreachable!()
        };
        marshaller.unmarshal(&data, &mut holder).unwrap();
        assert_eq!(holder.previous.as_ref().unwrap().timeout, Duration::from_secs(2));

        let Value::Object(data) = json!({"previous": {}}) else { unreachable!() };
        marshaller.unmarshal(&data, &mut holder).unwrap();
        assert_eq!(holder.previous.as_ref().unwrap().timeout, Duration::from_secs(2));

        let Value::Object(data) = json!({"previous": null}) else { unreachable!() };
        marshaller.unmarshal(&data, &mut holder).unwrap();
        assert_eq!(holder.previous, None);

        let Value::Object(data) = json!({"previous": 3}) else { unreachable!() };
        let err = marshaller.unmarshal(&data, &mut holder).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::TypeConversion { ref field, .. } if field == "previous"
        ));
    }
}
