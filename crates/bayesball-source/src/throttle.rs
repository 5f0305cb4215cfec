//! Call pacing for the upstream API.

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

use crate::{Error, Result};

/// Serialises calls, keeps at least `min_interval` between their starts, and
/// refuses calls once `max_calls` have been made.
///
/// The lock is held while waiting, so concurrent callers queue up rather
/// than fanning out.
#[derive(Debug)]
pub struct Throttle {
  min_interval: Duration,
  max_calls:    Option<u32>,
  state:        Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
  last_call: Option<Instant>,
  calls:     u32,
}

impl Throttle {
  pub fn new(min_interval: Duration, max_calls: Option<u32>) -> Self {
    Self { min_interval, max_calls, state: Mutex::new(State::default()) }
  }

  /// Wait until the next call may start and count it.
  pub async fn acquire(&self) -> Result<()> {
    let mut state = self.state.lock().await;

    if let Some(max) = self.max_calls
      && state.calls >= max
    {
      return Err(Error::CallBudgetExhausted(max));
    }

    if let Some(last) = state.last_call {
      tokio::time::sleep_until(last + self.min_interval).await;
    }

    state.calls += 1;
    state.last_call = Some(Instant::now());
    Ok(())
  }

  /// Calls made so far.
  pub async fn calls_made(&self) -> u32 { self.state.lock().await.calls }
}

#[cfg(test)]
mod tests {
  use bayesball_core::{Classify as _, ErrorKind};

  use super::*;

  #[tokio::test]
  async fn refuses_calls_past_the_cap() {
    let throttle = Throttle::new(Duration::ZERO, Some(2));
    throttle.acquire().await.unwrap();
    throttle.acquire().await.unwrap();

    let err = throttle.acquire().await.unwrap_err();
    assert!(matches!(err, Error::CallBudgetExhausted(2)));
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(throttle.calls_made().await, 2);
  }

  #[tokio::test]
  async fn spaces_consecutive_calls() {
    let gap = Duration::from_millis(40);
    let throttle = Throttle::new(gap, None);

    let started = Instant::now();
    throttle.acquire().await.unwrap();
    assert!(started.elapsed() < gap, "first call must not wait");
    throttle.acquire().await.unwrap();
    throttle.acquire().await.unwrap();
    assert!(started.elapsed() >= gap * 2);
  }
}
