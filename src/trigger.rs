//! Schedule triggers
//!
//! Three disjoint trigger kinds bind a scheduled task to its firing times:
//! `cron` (calendar-field recurrence), `interval` (fixed period), `date`
//! (one-shot absolute time). Raw `trigger_params` maps are parsed into a
//! typed [`TriggerSpec`]; unknown kinds are rejected up front.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use cron::Schedule;
use serde_json::Value;

use crate::error::FlowError;

/// Typed trigger, parsed from `(trigger_kind, trigger_params)`
#[derive(Debug, Clone)]
pub enum TriggerSpec {
    Cron {
        expression: String,
        schedule: Schedule,
    },
    Interval {
        period: Duration,
    },
    Date {
        run_date: DateTime<Local>,
    },
}

impl TriggerSpec {
    /// Parse a trigger from its persisted form.
    pub fn from_parts(kind: &str, params: &Value) -> Result<Self, FlowError> {
        match kind {
            "cron" => {
                let expression = params
                    .get("expression")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        FlowError::Scheduler("cron trigger requires params.expression".into())
                    })?
                    .to_string();

                // Accept standard 5-field crontab by pinning seconds to 0
                let normalized = if expression.split_whitespace().count() == 5 {
                    format!("0 {expression}")
                } else {
                    expression.clone()
                };
                let schedule = Schedule::from_str(&normalized).map_err(|e| {
                    FlowError::Scheduler(format!("invalid cron expression '{expression}': {e}"))
                })?;

                Ok(TriggerSpec::Cron {
                    expression,
                    schedule,
                })
            }
            "interval" => {
                let field = |name: &str| -> Result<u64, FlowError> {
                    match params.get(name) {
                        None | Some(Value::Null) => Ok(0),
                        Some(v) => v.as_u64().ok_or_else(|| {
                            FlowError::Scheduler(format!(
                                "interval param '{name}' must be a non-negative integer"
                            ))
                        }),
                    }
                };

                let seconds = field("weeks")? * 7 * 86_400
                    + field("days")? * 86_400
                    + field("hours")? * 3_600
                    + field("minutes")? * 60
                    + field("seconds")?;

                if seconds == 0 {
                    // A zero period would fire in a tight loop
                    return Err(FlowError::Scheduler(
                        "interval trigger requires a non-zero period".into(),
                    ));
                }

                Ok(TriggerSpec::Interval {
                    period: Duration::from_secs(seconds),
                })
            }
            "date" => {
                let raw = params
                    .get("run_date")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        FlowError::Scheduler("date trigger requires params.run_date".into())
                    })?;

                let run_date = parse_run_date(raw).ok_or_else(|| {
                    FlowError::Scheduler(format!("invalid run_date '{raw}'"))
                })?;

                Ok(TriggerSpec::Date { run_date })
            }
            other => Err(FlowError::Scheduler(format!(
                "unknown trigger kind '{other}' (expected cron, interval or date)"
            ))),
        }
    }

    /// Next firing strictly after `after`. `None` means the trigger is
    /// exhausted (a cron expression with no future match).
    ///
    /// A `date` in the past still returns its instant: the one-shot fires
    /// immediately once, then deregisters.
    pub fn next_occurrence(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            TriggerSpec::Cron { schedule, .. } => schedule.after(&after).next(),
            TriggerSpec::Interval { period } => {
                after.checked_add_signed(chrono::Duration::from_std(*period).ok()?)
            }
            TriggerSpec::Date { run_date } => Some(*run_date),
        }
    }

    /// One-shot triggers deregister themselves after firing
    pub fn is_one_shot(&self) -> bool {
        matches!(self, TriggerSpec::Date { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerSpec::Cron { .. } => "cron",
            TriggerSpec::Interval { .. } => "interval",
            TriggerSpec::Date { .. } => "date",
        }
    }
}

/// RFC3339, or a naive local `YYYY-MM-DD HH:MM:SS`
fn parse_run_date(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()?;
    Local.from_local_datetime(&naive).single()
}
