use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// W3C-flavored trace context threaded through every hop of a request.
///
/// `trace_id` is preserved end to end; `span_id` changes on every child
/// span. Baggage is a flat string map rendered as a comma-joined header on
/// the wire, never interpreted by the core itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub trace_flags: u8,
    pub baggage: BTreeMap<String, String>,
}

const SAMPLED_FLAG: u8 = 0x01;

impl TraceContext {
    pub fn new(trace_id: u128, span_id: u64) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags: 0,
            baggage: BTreeMap::new(),
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags & SAMPLED_FLAG != 0
    }

    pub fn with_sampled(mut self, sampled: bool) -> Self {
        if sampled {
            self.trace_flags |= SAMPLED_FLAG;
        } else {
            self.trace_flags &= !SAMPLED_FLAG;
        }
        self
    }

    pub fn with_baggage(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.baggage.insert(key.into(), value.into());
        self
    }

    /// Derives a child span: same `trace_id`, new `span_id`, same flags and
    /// baggage.
    pub fn child(&self, new_span_id: u64) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: new_span_id,
            trace_flags: self.trace_flags,
            baggage: self.baggage.clone(),
        }
    }

    /// Serializes `{version}-{trace-id}-{parent-id}-{flags}` per the W3C
    /// traceparent grammar. Always exactly 55 ASCII characters.
    pub fn to_traceparent(&self) -> String {
        format!("00-{:032x}-{:016x}-{:02x}", self.trace_id, self.span_id, self.trace_flags)
    }

    pub fn from_traceparent(s: &str) -> Result<Self, TraceContextError> {
        if s.len() != 55 {
            return Err(TraceContextError::WrongLength(s.len()));
        }
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 {
            return Err(TraceContextError::Malformed);
        }
        let [version, trace_id, span_id, flags] = [parts[0], parts[1], parts[2], parts[3]];
        if version != "00" {
            return Err(TraceContextError::UnsupportedVersion);
        }
        if trace_id.len() != 32 || span_id.len() != 16 || flags.len() != 2 {
            return Err(TraceContextError::Malformed);
        }
        let trace_id = u128::from_str_radix(trace_id, 16).map_err(|_| TraceContextError::Malformed)?;
        let span_id = u64::from_str_radix(span_id, 16).map_err(|_| TraceContextError::Malformed)?;
        let trace_flags = u8::from_str_radix(flags, 16).map_err(|_| TraceContextError::Malformed)?;
        if trace_id == 0 {
            return Err(TraceContextError::ZeroTraceId);
        }
        Ok(Self {
            trace_id,
            span_id,
            trace_flags,
            baggage: BTreeMap::new(),
        })
    }

    /// Renders baggage as a comma-joined `key=value` header value, in key
    /// order (`BTreeMap` keeps this deterministic).
    pub fn baggage_header(&self) -> String {
        self.baggage
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn with_baggage_header(mut self, header: &str) -> Self {
        for pair in header.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            if let Some((k, v)) = pair.split_once('=') {
                self.baggage.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceContextError {
    #[error("traceparent must be exactly 55 characters, got {0}")]
    WrongLength(usize),
    #[error("traceparent is not well-formed")]
    Malformed,
    #[error("traceparent version is not supported")]
    UnsupportedVersion,
    #[error("trace-id must not be all zero")]
    ZeroTraceId,
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_traceparent())
    }
}
