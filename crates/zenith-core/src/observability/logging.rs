use std::cell::RefCell;
use std::collections::BTreeMap;

use super::trace::TraceContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Warn => "WARN",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// A single emitted log line: message plus the merged attribute set
/// (caller-supplied, scoped stack, and active trace context).
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub severity: LogSeverity,
    pub message: String,
    pub attributes: BTreeMap<String, String>,
}

pub trait Logger: Send + Sync {
    fn log(&self, record: LogRecord);
}

impl<T: Logger + ?Sized> LoggerExt for T {}

pub trait LoggerExt: Logger {
    fn log_with(
        &self,
        severity: LogSeverity,
        message: impl Into<String>,
        attrs: &[(&str, &str)],
        trace: Option<&TraceContext>,
    ) {
        let mut merged = BTreeMap::new();
        ScopedAttributes::for_each_scope(|scope| {
            for (k, v) in scope {
                merged.insert(k.clone(), v.clone());
            }
        });
        for (k, v) in attrs {
            merged.insert((*k).to_string(), (*v).to_string());
        }
        if let Some(trace) = trace {
            merged.insert("trace_id".to_string(), format!("{:032x}", trace.trace_id));
            merged.insert("span_id".to_string(), format!("{:016x}", trace.span_id));
            merged.insert("trace_flags".to_string(), format!("{:02x}", trace.trace_flags));
        }
        self.log(LogRecord {
            severity,
            message: message.into(),
            attributes: merged,
        });
    }
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<BTreeMap<String, String>>> = RefCell::new(Vec::new());
}

/// A thread-local stack of attribute maps. Every log call on this thread
/// merges in the union of currently-open scopes. Scopes destroy LIFO: the
/// guard's `Drop` pops exactly the frame it pushed, even under a panic
/// unwind, because indices are matched by depth at push time.
pub struct ScopedAttributes {
    depth: usize,
}

impl ScopedAttributes {
    pub fn push(attrs: BTreeMap<String, String>) -> Self {
        let depth = SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(attrs);
            stack.len()
        });
        Self { depth }
    }

    fn for_each_scope(mut f: impl FnMut(&BTreeMap<String, String>)) {
        SCOPE_STACK.with(|stack| {
            for scope in stack.borrow().iter() {
                f(scope);
            }
        });
    }
}

impl Drop for ScopedAttributes {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "scoped attributes must pop LIFO");
            stack.truncate(self.depth - 1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CapturingLogger(Arc<Mutex<Vec<LogRecord>>>);
    impl Logger for CapturingLogger {
        fn log(&self, record: LogRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    #[test]
    fn scopes_merge_and_pop_lifo() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let logger = CapturingLogger(sink.clone());

        let mut outer = BTreeMap::new();
        outer.insert("service".to_string(), "uri-shortener".to_string());
        let _outer_scope = ScopedAttributes::push(outer);

        {
            let mut inner = BTreeMap::new();
            inner.insert("op".to_string(), "shorten".to_string());
            let _inner_scope = ScopedAttributes::push(inner);
            logger.log_with(LogSeverity::Info, "inside", &[], None);
        }
        logger.log_with(LogSeverity::Info, "outside", &[], None);

        let records = sink.lock().unwrap();
        assert_eq!(records[0].attributes.get("op"), Some(&"shorten".to_string()));
        assert_eq!(records[0].attributes.get("service"), Some(&"uri-shortener".to_string()));
        assert_eq!(records[1].attributes.get("op"), None);
        assert_eq!(records[1].attributes.get("service"), Some(&"uri-shortener".to_string()));
    }
}
