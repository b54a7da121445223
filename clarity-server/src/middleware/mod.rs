//! HTTP middleware stack: CORS policy and per-request trace-ID spans.

pub mod cors;
pub mod trace;
