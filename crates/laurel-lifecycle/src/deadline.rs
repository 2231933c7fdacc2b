//! Bounded store calls.

use std::{future::Future, time::Duration};

use laurel_core::{Error, Result};

/// Every store call made by the lifecycle goes through [`Deadline::run`].
/// A call that errors or outlives the limit becomes
/// [`Error::StoreFailure`] tagged with the stage it was attempting.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  limit: Duration,
}

impl Deadline {
  pub fn new(limit: Duration) -> Self { Self { limit } }

  pub async fn run<T, E, F>(&self, stage: &'static str, call: F) -> Result<T>
  where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
  {
    match tokio::time::timeout(self.limit, call).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(e)) => Err(Error::store(stage, e)),
      Err(elapsed) => Err(Error::store(stage, elapsed)),
    }
  }
}

impl Default for Deadline {
  fn default() -> Self { Self::new(Duration::from_secs(5)) }
}
