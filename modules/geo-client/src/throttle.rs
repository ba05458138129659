use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive calls to one provider.
///
/// Public geocoders (Nominatim in particular) ask clients to stay under one
/// request per second. Each client owns its own throttle, so two providers
/// never wait on each other.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the next call is allowed, then record it.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let pause = self.min_interval - elapsed;
                tracing::trace!(pause_ms = pause.as_millis() as u64, "Throttling provider call");
                tokio::time::sleep(pause).await;
            }
        }
        *last = Some(Instant::now());
    }
}
