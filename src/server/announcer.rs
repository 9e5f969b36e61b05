//! Periodic roster announcer
//!
//! While armed, broadcasts the list of connected names at a fixed interval.
//! The first firing happens as soon as it is armed.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};

use crate::client::ClientRegistry;

pub struct RosterAnnouncer {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RosterAnnouncer {
    /// Start announcing the roster of `registry` every `period`.
    pub fn arm(registry: Arc<ClientRegistry>, period: Duration) -> Self {
        let stop = watch::Sender::new(false);
        let mut stopped = stop.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop_requested(&mut stopped) => break,
                    _ = ticker.tick() => {
                        registry.broadcast_roster().await;
                    }
                }
            }
            debug!("Roster announcer stopped");
        });

        info!("Roster announcer armed (every {:?})", period);
        Self { stop, task }
    }

    /// Stop announcing.
    ///
    /// Waits up to `grace` for a firing that is already running, then
    /// aborts it.
    pub async fn disarm(self, grace: Duration) {
        self.stop.send_replace(true);

        let mut task = self.task;
        if timeout(grace, &mut task).await.is_err() {
            warn!("Roster announcer did not stop within {:?}; aborting", grace);
            task.abort();
        }
    }
}

async fn stop_requested(stopped: &mut watch::Receiver<bool>) {
    let _ = stopped.wait_for(|s| *s).await;
}
