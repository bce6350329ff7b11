//! Instrumentation hook.
//!
//! Event names and parameter keys are stable; hosting layers key their dashboards on them.

use std::collections::BTreeMap;
use std::fmt;

pub const EVENT_MOUNT: &str = "mount";
pub const EVENT_PREPARE_MOUNT: &str = "prepare_mount";
pub const EVENT_CALCULATE_LAYOUT_STATE: &str = "calculate_layout_state";

pub const PARAM_MOUNTED_COUNT: &str = "mounted_count";
pub const PARAM_UNMOUNTED_COUNT: &str = "unmounted_count";
pub const PARAM_UPDATED_COUNT: &str = "updated_count";
pub const PARAM_MOVED_COUNT: &str = "moved_count";
pub const PARAM_NO_OP_COUNT: &str = "no_op_count";
pub const PARAM_IS_DIRTY: &str = "is_dirty";
pub const PARAM_OUTPUT_COUNT: &str = "output_count";
pub const PARAM_LOG_TAG: &str = "log_tag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Count(usize),
    Flag(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Count(count) => write!(f, "{}", count),
            ParamValue::Flag(flag) => write!(f, "{}", flag),
            ParamValue::Text(text) => write!(f, "{:?}", text),
        }
    }
}

/// A structured instrumentation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfEvent {
    name: &'static str,
    params: BTreeMap<&'static str, ParamValue>,
}

impl PerfEvent {
    pub fn new(name: &'static str) -> PerfEvent {
        PerfEvent {
            name,
            params: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, key: &'static str, count: usize) -> PerfEvent {
        self.params.insert(key, ParamValue::Count(count));
        self
    }

    pub fn with_flag(mut self, key: &'static str, flag: bool) -> PerfEvent {
        self.params.insert(key, ParamValue::Flag(flag));
        self
    }

    pub fn with_text(mut self, key: &'static str, text: impl Into<String>) -> PerfEvent {
        self.params.insert(key, ParamValue::Text(text.into()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Returns a count parameter, if present.
    pub fn count(&self, key: &str) -> Option<usize> {
        match self.params.get(key) {
            Some(ParamValue::Count(count)) => Some(*count),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.params.get(key) {
            Some(ParamValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }
}

impl fmt::Display for PerfEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.params {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Receives instrumentation events from layout calculation and mounting.
pub trait ComponentsLogger: Send + Sync {
    fn log(&self, event: PerfEvent);

    /// Whether events with this name should be built at all.
    fn is_tracing(&self, name: &'static str) -> bool {
        let _ = name;
        true
    }
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogger;

impl ComponentsLogger for LogLogger {
    fn log(&self, event: PerfEvent) {
        log::debug!(target: "roost::perf", "{}", event);
    }

    fn is_tracing(&self, _: &'static str) -> bool {
        log::log_enabled!(target: "roost::perf", log::Level::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_round_out_the_display() {
        let event = PerfEvent::new(EVENT_MOUNT)
            .with_count(PARAM_MOUNTED_COUNT, 2)
            .with_flag(PARAM_IS_DIRTY, false)
            .with_text(PARAM_LOG_TAG, "feed");
        assert_eq!(event.count(PARAM_MOUNTED_COUNT), Some(2));
        assert_eq!(event.count(PARAM_IS_DIRTY), None);
        assert_eq!(event.flag(PARAM_IS_DIRTY), Some(false));
        assert_eq!(
            event.to_string(),
            "mount is_dirty=false log_tag=\"feed\" mounted_count=2"
        );
    }
}
