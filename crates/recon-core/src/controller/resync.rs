use std::{sync::Arc, time::Duration};

use recon_model::DEFAULT_QUEUE_KEY;
use recon_queue::QueueHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Enqueues the default key immediately and then once per period.
pub(crate) struct ResyncTimer {
    controller: Arc<str>,
    queue: QueueHandle,
    period: Duration,
}

impl ResyncTimer {
    pub(crate) fn new(controller: Arc<str>, queue: QueueHandle, period: Duration) -> Self {
        Self {
            controller,
            queue,
            period,
        }
    }

    pub(crate) async fn run(self, token: CancellationToken) {
        if self.period.is_zero() {
            warn!(controller = %self.controller, "zero resync period, timer disabled");
            return;
        }
        debug!(controller = %self.controller, period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX), "resync timer started");

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tick.tick() => {
                    trace!(controller = %self.controller, "resync");
                    self.queue.add(DEFAULT_QUEUE_KEY);
                }
            }
        }
        debug!(controller = %self.controller, "resync timer stopped");
    }
}
