//! Shared fixtures and harness for the routing graph integration tests.

pub mod test_util;
