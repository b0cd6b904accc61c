use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::Command;
use crate::store::Event;

/// Refresh often enough to notice day boundaries.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Current wall-clock time in ms since the epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Feeds fresh time values into the store loop
pub(crate) struct Clock {
    commands: mpsc::Sender<Command>,
    interval: Duration,
}

impl Clock {
    pub(crate) fn new(commands: mpsc::Sender<Command>) -> Self {
        Self {
            commands,
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval = ?self.interval, "Clock started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the store already has the time.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Clock shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let now = now_millis();
                    debug!(now, "Tick");
                    if self.commands.send(Command::Dispatch(Event::Tick(now))).await.is_err() {
                        debug!("Store loop gone, clock stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_sends_ticks() {
        let (tx, mut rx) = mpsc::channel(8);
        let clock = Clock::new(tx).with_interval(Duration::from_secs(60));
        let shutdown = CancellationToken::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { clock.run(shutdown).await })
        };

        for _ in 0..2 {
            match rx.recv().await {
                Some(Command::Dispatch(Event::Tick(now))) => assert!(now > 0),
                other => panic!("unexpected command: {:?}", other),
            }
        }

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_clock_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let clock = Clock::new(tx).with_interval(Duration::from_millis(5));
        clock.run(CancellationToken::new()).await;
    }
}
