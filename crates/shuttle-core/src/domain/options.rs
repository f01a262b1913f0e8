//! Typed command options.
//!
//! Each command carries its options as keyed data; routes decode them into the
//! types below through the marshaller. Key names follow the orchestration
//! service's wire format.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::marshal::{FieldType, Reflect, TypeDescriptor};

/// ワークフロー実行の識別子
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowExecution {
    pub id: String,
    pub run_id: String,
}

impl Reflect for WorkflowExecution {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("ID", FieldType::String, |e| &e.id, |e| &mut e.id)
            .field("RunID", FieldType::String, |e| &e.run_id, |e| &mut e.run_id);
    }
}

/// ワークフロー型名
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowType {
    pub name: String,
}

impl Reflect for WorkflowType {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("Name", FieldType::String, |t| &t.name, |t| &mut t.name);
    }
}

/// Describes one workflow run. Shared with running instances, so it is
/// copy-on-write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowInfo {
    pub execution: WorkflowExecution,
    pub workflow_type: WorkflowType,
    pub task_queue: String,
    pub namespace: String,
    pub attempt: i64,
    pub run_timeout: Option<Duration>,
    pub cron_schedule: Option<String>,
}

impl Reflect for WorkflowInfo {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.object("WorkflowExecution", |i| &i.execution, |i| &mut i.execution)
            .object("WorkflowType", |i| &i.workflow_type, |i| &mut i.workflow_type)
            .field(
                "TaskQueueName",
                FieldType::String,
                |i| &i.task_queue,
                |i| &mut i.task_queue,
            )
            .field("Namespace", FieldType::String, |i| &i.namespace, |i| &mut i.namespace)
            .field("Attempt", FieldType::Int, |i| &i.attempt, |i| &mut i.attempt)
            .field(
                "WorkflowRunTimeout",
                FieldType::nullable(FieldType::Duration),
                |i| &i.run_timeout,
                |i| &mut i.run_timeout,
            )
            .field(
                "CronSchedule",
                FieldType::nullable(FieldType::String),
                |i| &i.cron_schedule,
                |i| &mut i.cron_schedule,
            )
            .copy_on_write();
    }
}

/// アクティビティ型名
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityType {
    pub name: String,
}

impl Reflect for ActivityType {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("Name", FieldType::String, |t| &t.name, |t| &mut t.name);
    }
}

/// アクティビティ実行の情報（copy-on-write）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityInfo {
    pub id: String,
    pub activity_type: ActivityType,
    pub workflow_execution: WorkflowExecution,
    pub task_queue: String,
    pub attempt: i64,
    pub scheduled_time: DateTime<Utc>,
    pub started_time: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub heartbeat_timeout: Duration,
}

impl Reflect for ActivityInfo {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("ActivityID", FieldType::String, |i| &i.id, |i| &mut i.id)
            .object("ActivityType", |i| &i.activity_type, |i| &mut i.activity_type)
            .object(
                "WorkflowExecution",
                |i| &i.workflow_execution,
                |i| &mut i.workflow_execution,
            )
            .field("TaskQueue", FieldType::String, |i| &i.task_queue, |i| &mut i.task_queue)
            .field("Attempt", FieldType::Int, |i| &i.attempt, |i| &mut i.attempt)
            .field(
                "ScheduledTime",
                FieldType::DateTime,
                |i| &i.scheduled_time,
                |i| &mut i.scheduled_time,
            )
            .field(
                "StartedTime",
                FieldType::DateTime,
                |i| &i.started_time,
                |i| &mut i.started_time,
            )
            .field(
                "Deadline",
                FieldType::nullable(FieldType::DateTime),
                |i| &i.deadline,
                |i| &mut i.deadline,
            )
            .field(
                "HeartbeatTimeout",
                FieldType::Duration,
                |i| &i.heartbeat_timeout,
                |i| &mut i.heartbeat_timeout,
            )
            .copy_on_write();
    }
}

/// StartWorkflow のオプション
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartWorkflowOptions {
    pub info: WorkflowInfo,
}

impl Reflect for StartWorkflowOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.object("info", |o| &o.info, |o| &mut o.info);
    }
}

/// InvokeActivity のオプション
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeActivityOptions {
    pub name: String,
    pub info: ActivityInfo,
}

impl Reflect for InvokeActivityOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("name", FieldType::String, |o| &o.name, |o| &mut o.name)
            .object("info", |o| &o.info, |o| &mut o.info);
    }
}

/// InvokeSignal のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeSignalOptions {
    pub run_id: String,
    pub name: String,
}

impl Reflect for InvokeSignalOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("runId", FieldType::String, |o| &o.run_id, |o| &mut o.run_id)
            .field("name", FieldType::String, |o| &o.name, |o| &mut o.name);
    }
}

/// InvokeQuery のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeQueryOptions {
    pub run_id: String,
    pub name: String,
}

impl Reflect for InvokeQueryOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("runId", FieldType::String, |o| &o.run_id, |o| &mut o.run_id)
            .field("name", FieldType::String, |o| &o.name, |o| &mut o.name);
    }
}

/// StackTrace のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTraceOptions {
    pub run_id: String,
}

impl Reflect for StackTraceOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("runId", FieldType::String, |o| &o.run_id, |o| &mut o.run_id);
    }
}

/// DestroyWorkflow のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestroyWorkflowOptions {
    pub run_id: String,
}

impl Reflect for DestroyWorkflowOptions {
    fn reflect(d: &mut TypeDescriptor<Self>) {
        d.field("runId", FieldType::String, |o| &o.run_id, |o| &mut o.run_id);
    }
}
