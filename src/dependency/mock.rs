//! Mock dependency for unit testing.
//!
//! This module provides a dependency that can be used in tests
//! without a running database or cache.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use super::Dependency;
use crate::error::ConnectError;

/// Scripted dependency.
///
/// The first `failures` connect attempts fail; every later attempt succeeds
/// and sets the connected flag.
#[derive(Debug)]
pub struct MockDependency {
    name: &'static str,
    connected: AtomicBool,
    failures: AtomicU32,
    attempts: AtomicU32,
}

impl MockDependency {
    /// Create a mock whose connects succeed immediately.
    pub fn new(name: &'static str) -> Self {
        Self::failing(name, 0)
    }

    /// Create a mock whose first `failures` connects fail.
    pub fn failing(name: &'static str, failures: u32) -> Self {
        Self {
            name,
            connected: AtomicBool::new(false),
            failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }

    /// Create a mock whose connects never succeed.
    pub fn unreachable(name: &'static str) -> Self {
        Self::failing(name, u32::MAX)
    }

    /// Create a mock already in the given state.
    pub fn with_state(name: &'static str, connected: bool) -> Self {
        let mock = Self::new(name);
        mock.set_connected(connected);
        mock
    }

    /// Force the connected flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of connect attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dependency for MockDependency {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(ConnectError::Unavailable(format!(
                "{} refused attempt {}",
                self.name, attempt
            )));
        }

        self.set_connected(true);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
