//! Typed activity - 型付きアクティビティ API
//!
//! # 二層構造
//! - **表層（Typed）**: `Activity<I>` trait - 入力も出力も `Reflect` 型
//! - **内部（Dyn）**: `ActivityHandler` - payload は `serde_json::Value` のまま
//!
//! `TypedActivity<I, A>` が両者をつなぎます。第 1 payload をキー付きデータとして
//! `Marshaller::decode` し、戻り値を `Marshaller::marshal` して 1 要素の payload にします。

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CommandResult, Failure, FailureKind, Payloads};
use crate::marshal::Reflect;
use crate::ports::{ActivityContext, ActivityHandler, ActivityPrototype};

/// # 使用例
/// ```ignore
/// struct Hello;
///
/// #[async_trait]
/// impl Activity<HelloInput> for Hello {
///     type Output = HelloOutput;
///
///     async fn run(&self, ctx: &ActivityContext, input: HelloInput) -> Result<HelloOutput, Failure> {
///         Ok(HelloOutput { greeting: format!("hello {}", input.name), at: ctx.now() })
///     }
/// }
///
/// queue.register_activity(typed_activity("Hello", Hello), false)?;
/// ```
#[async_trait]
pub trait Activity<I: Reflect + Default>: Send + Sync + 'static {
    type Output: Reflect;

    async fn run(&self, ctx: &ActivityContext, input: I) -> Result<Self::Output, Failure>;
}

/// Activity<I> を ActivityHandler に変換するアダプタ
pub struct TypedActivity<I, A> {
    activity: A,
    _input: PhantomData<fn() -> I>,
}

impl<I, A> TypedActivity<I, A>
where
    I: Reflect + Default,
    A: Activity<I>,
{
    /// Activity を包む
    pub fn new(activity: A) -> Self {
        Self {
            activity,
            _input: PhantomData,
        }
    }
}

#[async_trait]
impl<I, A> ActivityHandler for TypedActivity<I, A>
where
    I: Reflect + Default,
    A: Activity<I>,
{
    async fn execute(&self, ctx: ActivityContext, args: Payloads) -> CommandResult {
        let input = match args.into_iter().next() {
            Some(Value::Object(data)) => ctx.marshaller().decode::<I>(&data)?,
            Some(other) => {
                return Err(Failure::new(
                    FailureKind::TypeConversion,
                    format!("activity input must be an object, found {other}"),
                ));
            }
            None => I::default(),
        };

        let output = self.activity.run(&ctx, input).await?;
        let data = ctx.marshaller().marshal(&output)?;
        Ok(vec![Value::Object(data)])
    }
}

/// Wraps `activity` into a prototype registered under `name`.
pub fn typed_activity<I, A>(name: impl Into<String>, activity: A) -> ActivityPrototype
where
    I: Reflect + Default,
    A: Activity<I>,
{
    ActivityPrototype::new(name, Arc::new(TypedActivity::new(activity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    use crate::domain::{ActivityInfo, Headers};
    use crate::marshal::{FieldType, Marshaller, TypeDescriptor};
    use crate::ports::Prototype;

    #[derive(Debug, Clone, Default)]
    struct Order {
        sku: String,
        quantity: i64,
    }

    impl Reflect for Order {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.field("sku", FieldType::String, |o| &o.sku, |o| &mut o.sku);
            d.field("quantity", FieldType::Int, |o| &o.quantity, |o| &mut o.quantity);
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Receipt {
        line: String,
        at: DateTime<Utc>,
    }

    impl Reflect for Receipt {
        fn reflect(d: &mut TypeDescriptor<Self>) {
            d.getter("line", FieldType::String, |r| &r.line);
            d.getter("at", FieldType::DateTime, |r| &r.at);
        }
    }

    struct Checkout;

    #[async_trait]
    impl Activity<Order> for Checkout {
        type Output = Receipt;

        async fn run(&self, ctx: &ActivityContext, input: Order) -> Result<Receipt, Failure> {
            if input.quantity <= 0 {
                return Err(Failure::application("quantity must be positive"));
            }
            Ok(Receipt {
                line: format!("{} x{}", input.sku, input.quantity),
                at: ctx.now(),
            })
        }
    }

    fn ctx() -> ActivityContext {
        ActivityContext::new(
            ActivityInfo::default(),
            Headers::new(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            Arc::new(Marshaller::default()),
        )
    }

    #[tokio::test]
    async fn test_decodes_input_and_marshals_output() {
        let prototype = typed_activity::<Order, _>("Checkout", Checkout);
        assert_eq!(prototype.name(), "Checkout");
        let out = prototype
            .handler()
            .execute(ctx(), vec![json!({"sku": "tea", "quantity": 2})])
            .await
            .unwrap();
        assert_eq!(
            out,
            vec![json!({"line": "tea x2", "at": "2024-03-01T12:00:00Z"})]
        );
    }

    #[tokio::test]
    async fn test_application_failures_pass_through() {
        let handler = TypedActivity::<Order, _>::new(Checkout);
        let err = handler
            .execute(ctx(), vec![json!({"sku": "tea", "quantity": 0})])
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Application);
    }

    #[tokio::test]
    async fn test_malformed_input_is_a_conversion_failure() {
        let handler = TypedActivity::<Order, _>::new(Checkout);

        let err = handler.execute(ctx(), vec![json!("tea")]).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::TypeConversion);

        let err = handler
            .execute(ctx(), vec![json!({"sku": "tea", "quantity": "two"})])
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::TypeConversion);
    }
}
