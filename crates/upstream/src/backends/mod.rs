//! Upstream backends.

pub mod http;
