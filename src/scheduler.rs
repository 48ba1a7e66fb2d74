//! Flow scheduling service
//!
//! Maintains a durable registry of scheduled execution tasks and fires the
//! orchestrator on their triggers. The registry file (a JSON array) is
//! rewritten wholesale on every mutating call; it keeps one process's
//! mutations consistent but carries no cross-process protection. Nothing
//! serializes overlapping fires of one task either — both are inherited
//! limitations, documented rather than fixed.
//!
//! Each live trigger is a spawned loop on the background runtime; a firing
//! executes the flow there, never on the caller's thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::engine::AutomationEngine;
use crate::error::FlowError;
use crate::executor::FlowExecutor;
use crate::result::ExecutionResult;
use crate::trigger::TriggerSpec;

/// Delivered after each fire: `(task_id, result)`
pub type ResultCallback = Arc<dyn Fn(&str, &ExecutionResult) + Send + Sync>;

/// Persisted record of one scheduled task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub flow_config_path: String,
    pub trigger_kind: String,
    pub trigger_params: Value,
    pub enabled: bool,
    pub created_at: String,
    #[serde(default)]
    pub last_run: Option<String>,
    /// Derived from the live trigger when observed; not authoritative
    #[serde(default)]
    pub next_run: Option<String>,
}

/// Fields of a task that [`FlowScheduler::update_task`] may replace
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub flow_config_path: Option<String>,
    pub trigger_kind: Option<String>,
    pub trigger_params: Option<Value>,
    pub enabled: Option<bool>,
}

struct JobHandle {
    handle: JoinHandle<()>,
    next_run: Arc<RwLock<Option<DateTime<Local>>>>,
}

struct SchedulerInner {
    tasks: RwLock<Vec<ScheduledTask>>,
    tasks_file: PathBuf,
    jobs: DashMap<String, JobHandle>,
    running: AtomicBool,
    callback: RwLock<Option<ResultCallback>>,
    engine: Arc<dyn AutomationEngine>,
    output_dir: PathBuf,
    resource_path: PathBuf,
}

/// Background scheduling service with a file-backed task registry
#[derive(Clone)]
pub struct FlowScheduler {
    inner: Arc<SchedulerInner>,
}

impl FlowScheduler {
    /// Load (or initialize) the registry and build the service. No triggers
    /// go live until [`start`](Self::start).
    pub fn new(
        engine: Arc<dyn AutomationEngine>,
        output_dir: impl Into<PathBuf>,
        resource_path: impl Into<PathBuf>,
        tasks_file: impl Into<PathBuf>,
    ) -> Self {
        let tasks_file = tasks_file.into();
        let tasks = load_tasks(&tasks_file);
        Self {
            inner: Arc::new(SchedulerInner {
                tasks: RwLock::new(tasks),
                tasks_file,
                jobs: DashMap::new(),
                running: AtomicBool::new(false),
                callback: RwLock::new(None),
                engine,
                output_dir: output_dir.into(),
                resource_path: resource_path.into(),
            }),
        }
    }

    /// Register the result callback delivered on every fire
    pub fn set_result_callback(&self, callback: impl Fn(&str, &ExecutionResult) + Send + Sync + 'static) {
        *self.inner.callback.write() = Some(Arc::new(callback));
    }

    /// Go live: register triggers for all enabled tasks. Must be called
    /// from within a tokio runtime. Idempotent.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let enabled: Vec<ScheduledTask> = self
            .inner
            .tasks
            .read()
            .iter()
            .filter(|t| t.enabled)
            .cloned()
            .collect();
        for task in enabled {
            self.register_trigger(&task);
        }
        info!(tasks = self.inner.jobs.len(), "scheduler started");
    }

    /// Stop the service: all live triggers are dropped; metadata stays.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for entry in self.inner.jobs.iter() {
            entry.value().handle.abort();
        }
        self.inner.jobs.clear();
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Add a task. `Ok(false)` if the id already exists (registry
    /// unchanged); `Err` for an invalid trigger.
    pub fn add_task(
        &self,
        task_id: &str,
        flow_config_path: &str,
        trigger_kind: &str,
        trigger_params: Value,
        enabled: bool,
    ) -> Result<bool, FlowError> {
        // Reject unknown kinds and bad params before touching the registry
        TriggerSpec::from_parts(trigger_kind, &trigger_params)?;

        let task = {
            let mut tasks = self.inner.tasks.write();
            if tasks.iter().any(|t| t.task_id == task_id) {
                return Ok(false);
            }
            let task = ScheduledTask {
                task_id: task_id.to_string(),
                flow_config_path: flow_config_path.to_string(),
                trigger_kind: trigger_kind.to_string(),
                trigger_params,
                enabled,
                created_at: Local::now().to_rfc3339(),
                last_run: None,
                next_run: None,
            };
            tasks.push(task.clone());
            save_tasks(&self.inner.tasks_file, &tasks);
            task
        };

        if enabled && self.is_running() {
            self.register_trigger(&task);
        }
        Ok(true)
    }

    /// Remove a task. Idempotent: removing an unknown id or an already
    /// dropped trigger is a safe no-op.
    pub fn remove_task(&self, task_id: &str) -> bool {
        self.deregister_trigger(task_id);

        let mut tasks = self.inner.tasks.write();
        tasks.retain(|t| t.task_id != task_id);
        save_tasks(&self.inner.tasks_file, &tasks);
        true
    }

    /// Replace any subset of a task's fields. `Ok(false)` for an unknown
    /// id. The live trigger is unconditionally dropped and, when the task
    /// ends up enabled, re-registered — trigger state never drifts from
    /// the persisted metadata.
    pub fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<bool, FlowError> {
        let updated = {
            let mut tasks = self.inner.tasks.write();
            let Some(task) = tasks.iter_mut().find(|t| t.task_id == task_id) else {
                return Ok(false);
            };

            let kind = update.trigger_kind.as_deref().unwrap_or(&task.trigger_kind);
            let params = update
                .trigger_params
                .as_ref()
                .unwrap_or(&task.trigger_params);
            TriggerSpec::from_parts(kind, params)?;

            if let Some(path) = update.flow_config_path {
                task.flow_config_path = path;
            }
            if let Some(kind) = update.trigger_kind {
                task.trigger_kind = kind;
            }
            if let Some(params) = update.trigger_params {
                task.trigger_params = params;
            }
            if let Some(enabled) = update.enabled {
                task.enabled = enabled;
            }
            let updated = task.clone();
            save_tasks(&self.inner.tasks_file, &tasks);
            updated
        };

        self.deregister_trigger(task_id);
        if updated.enabled && self.is_running() {
            self.register_trigger(&updated);
        }
        Ok(true)
    }

    pub fn enable_task(&self, task_id: &str) -> Result<bool, FlowError> {
        self.update_task(
            task_id,
            TaskUpdate {
                enabled: Some(true),
                ..TaskUpdate::default()
            },
        )
    }

    pub fn disable_task(&self, task_id: &str) -> Result<bool, FlowError> {
        self.update_task(
            task_id,
            TaskUpdate {
                enabled: Some(false),
                ..TaskUpdate::default()
            },
        )
    }

    /// All tasks, with `next_run` read from the live trigger (None when no
    /// trigger is registered: disabled, not started, or a spent one-shot)
    pub fn get_tasks(&self) -> Vec<ScheduledTask> {
        self.inner
            .tasks
            .read()
            .iter()
            .map(|t| self.with_next_run(t))
            .collect()
    }

    pub fn get_task(&self, task_id: &str) -> Option<ScheduledTask> {
        self.inner
            .tasks
            .read()
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| self.with_next_run(t))
    }

    fn with_next_run(&self, task: &ScheduledTask) -> ScheduledTask {
        let mut task = task.clone();
        task.next_run = self
            .inner
            .jobs
            .get(&task.task_id)
            .and_then(|job| *job.next_run.read())
            .map(|dt| dt.to_rfc3339());
        task
    }

    fn register_trigger(&self, task: &ScheduledTask) {
        let spec = match TriggerSpec::from_parts(&task.trigger_kind, &task.trigger_params) {
            Ok(spec) => spec,
            Err(e) => {
                // Validated on the way in; a bad persisted record only gets here
                // from a hand-edited registry file
                warn!(task_id = %task.task_id, "cannot register trigger: {e}");
                return;
            }
        };

        let next_run = Arc::new(RwLock::new(None));
        let handle = tokio::spawn(trigger_loop(
            Arc::clone(&self.inner),
            task.task_id.clone(),
            task.flow_config_path.clone(),
            spec,
            Arc::clone(&next_run),
        ));

        debug!(task_id = %task.task_id, kind = %task.trigger_kind, "trigger registered");
        self.inner.jobs.insert(
            task.task_id.clone(),
            JobHandle { handle, next_run },
        );
    }

    fn deregister_trigger(&self, task_id: &str) {
        if let Some((_, job)) = self.inner.jobs.remove(task_id) {
            job.handle.abort();
            debug!(task_id, "trigger deregistered");
        }
    }
}

/// One live trigger: sleep to the next occurrence, fire, repeat.
async fn trigger_loop(
    inner: Arc<SchedulerInner>,
    task_id: String,
    flow_config_path: String,
    spec: TriggerSpec,
    next_run: Arc<RwLock<Option<DateTime<Local>>>>,
) {
    loop {
        let now = Local::now();
        let Some(next) = spec.next_occurrence(now) else {
            break;
        };
        *next_run.write() = Some(next);

        let delay = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        tokio::time::sleep(delay).await;

        fire(&inner, &task_id, &flow_config_path).await;

        if spec.is_one_shot() {
            break;
        }
    }
    // Exhausted or one-shot: drop the live trigger, keep the metadata
    inner.jobs.remove(&task_id);
}

/// Execute one fire of a task. Failures are isolated: they reach the result
/// callback as a failed result and never unwind into the trigger loop.
#[instrument(skip(inner, flow_config_path))]
async fn fire(inner: &Arc<SchedulerInner>, task_id: &str, flow_config_path: &str) {
    {
        let mut tasks = inner.tasks.write();
        if let Some(task) = tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.last_run = Some(Local::now().to_rfc3339());
        }
        save_tasks(&inner.tasks_file, &tasks);
    }

    info!(flow = flow_config_path, "scheduled task firing");
    let executor = FlowExecutor::new(
        Arc::clone(&inner.engine),
        inner.output_dir.clone(),
        inner.resource_path.clone(),
    );

    let result = match executor.execute_from_file(flow_config_path).await {
        Ok(result) => result,
        Err(e) => {
            warn!(task_id, "scheduled execution failed: {e}");
            ExecutionResult::failed(e.to_string())
        }
    };

    let callback = inner.callback.read().clone();
    if let Some(callback) = callback {
        callback(task_id, &result);
    }
}

fn load_tasks(path: &PathBuf) -> Vec<ScheduledTask> {
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path)
        .map_err(FlowError::from)
        .and_then(|s| serde_json::from_str(&s).map_err(FlowError::from))
    {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(file = %path.display(), "failed to load task registry: {e}");
            Vec::new()
        }
    }
}

/// Wholesale rewrite of the registry file. Write failures are logged, not
/// raised — a fire must not die on a transient disk error.
fn save_tasks(path: &PathBuf, tasks: &[ScheduledTask]) {
    let write = || -> Result<(), FlowError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(tasks)?)?;
        Ok(())
    };
    if let Err(e) = write() {
        warn!(file = %path.display(), "failed to save task registry: {e}");
    }
}
