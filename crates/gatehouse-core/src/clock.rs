//! Injected time source.
//!
//! Every rule that depends on "now" or "today" reads it from a [`Clock`], so
//! evaluation is deterministic under test.

use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// A source of the current instant.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: RwLock::new(now) } }

  pub fn set(&self, now: DateTime<Utc>) {
    let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
    *guard = now;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
    *guard += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.read().unwrap_or_else(|e| e.into_inner())
  }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn now(&self) -> DateTime<Utc> { (**self).now() }
}

/// The calendar date of `instant` as observed at `offset`.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
  instant.with_timezone(&offset).date_naive()
}
