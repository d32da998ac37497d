//! Test suites for the execution service.

pub(crate) mod support;
