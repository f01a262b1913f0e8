//! shuttle demo worker
//!
//! stdin から 1 行 1 コマンドの JSON（`Envelope`）を読み、`Worker` で dispatch して
//! 完了順に `Response` を 1 行ずつ stdout へ書きます。ログは stderr。
//!
//! ```text
//! {"id":1,"command":"StartWorkflow","options":{"info":{"WorkflowExecution":{"RunID":"r1"},"WorkflowType":{"Name":"Greeting"}}},"payloads":["hello"]}
//! {"id":2,"command":"InvokeSignal","options":{"runId":"r1","name":"name"},"payloads":["kai"]}
//! {"id":3,"command":"InvokeActivity","options":{"name":"Hello"},"payloads":[{"name":"kai"}]}
//! ```

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shuttle_core::domain::{Envelope, Failure};
use shuttle_core::impls::LocalWorkflow;
use shuttle_core::marshal::{FieldType, Reflect, TypeDescriptor};
use shuttle_core::ports::{ActivityContext, DeclaresWorkflows, WorkflowPrototype};
use shuttle_core::typed::{Activity, typed_activity};
use shuttle_core::{WorkerBuilder, WorkerConfig};

const CHANNEL_CAPACITY: usize = 64;

/// Waits for a `name` signal and greets with its first start argument.
struct Greeting;

impl DeclaresWorkflows for Greeting {
    fn workflows() -> Vec<WorkflowPrototype> {
        let body = LocalWorkflow::new(|ctx, args| async move {
            let salutation = args
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or("hello")
                .to_owned();
            ctx.expose("status", json!("waiting"));
            ctx.trace("waiting for signal `name`");

            let name = ctx.signal("name").await;
            let name = name.first().and_then(|v| v.as_str()).unwrap_or("stranger");
            ctx.expose("status", json!("done"));
            Ok(vec![json!(format!("{salutation} {name}"))])
        });
        vec![body.prototype("Greeting")]
    }
}

#[derive(Debug, Clone, Default)]
struct HelloInput {
    name: String,
}

impl Reflect for HelloInput {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("name", FieldType::String, |i| &i.name, |i| &mut i.name);
    }
}

#[derive(Debug, Clone, Default)]
struct HelloOutput {
    greeting: String,
    at: DateTime<Utc>,
}

impl Reflect for HelloOutput {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.getter("greeting", FieldType::String, |o| &o.greeting);
        d.getter("at", FieldType::DateTime, |o| &o.at);
    }
}

struct Hello;

#[async_trait]
impl Activity<HelloInput> for Hello {
    type Output = HelloOutput;

    async fn run(&self, ctx: &ActivityContext, input: HelloInput) -> Result<HelloOutput, Failure> {
        if input.name.is_empty() {
            return Err(Failure::application("`name` must not be empty"));
        }
        Ok(HelloOutput {
            greeting: format!("hello {}", input.name),
            at: ctx.now(),
        })
    }
}

fn init_tracing(config: &WorkerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter `{}`", config.log_filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();
    init_tracing(&config)?;

    let worker = WorkerBuilder::new()
        .config(config.clone())
        .task_queue(config.default_task_queue.clone(), |queue| {
            queue.add_workflow::<Greeting>(false)?;
            queue.register_activity(typed_activity::<HelloInput, _>("Hello", Hello), false)?;
            Ok(())
        })
        .expect_workflows(&["Greeting"])
        .expect_activities(&["Hello"])
        .build()
        .context("building worker")?;
    let worker = Arc::new(worker);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);
    let (resp_tx, mut resp_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut serving = tokio::spawn(Arc::clone(&worker).serve(cmd_rx, resp_tx, shutdown_rx));
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = resp_rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                shutdown_tx.send_replace(true);
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Envelope>(&line) {
                    Ok(envelope) => {
                        if cmd_tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "skipping malformed command line"),
                }
            }
        }
    }

    drop(cmd_tx);
    tokio::select! {
        joined = &mut serving => joined.context("worker task failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted while draining, shutting down");
            shutdown_tx.send_replace(true);
            serving.await.context("worker task failed")?;
        }
    }
    writer.await.context("writer task failed")??;
    drop(shutdown_tx);
    Ok(())
}
