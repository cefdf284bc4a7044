//! Online/offline status shared between the probe and the loader.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// Current connectivity plus change notifications.
///
/// Cheap to clone; all clones observe the same status.
#[derive(Clone)]
pub struct Connectivity {
  tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
  pub fn new(online: bool) -> Self {
    let (tx, _rx) = watch::channel(online);
    Self { tx: Arc::new(tx) }
  }

  pub fn is_online(&self) -> bool {
    *self.tx.borrow()
  }

  /// Update the status, notifying subscribers only when it changes.
  pub fn set_online(&self, online: bool) {
    let changed = self.tx.send_if_modified(|current| {
      if *current == online {
        false
      } else {
        *current = online;
        true
      }
    });

    if changed {
      info!(online, "Connectivity changed");
    }
  }

  /// Receiver that wakes on every online/offline transition.
  #[allow(dead_code)]
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }

  /// Periodically probe `url` and update the status from the outcome.
  ///
  /// Any HTTP response counts as online; only transport failures count as
  /// offline. The task exits once every `Connectivity` handle is dropped.
  pub fn spawn_probe(&self, client: reqwest::Client, url: Url, every: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(&self.tx);

    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      loop {
        ticker.tick().await;

        let online = match client.head(url.clone()).send().await {
          Ok(_) => true,
          Err(e) => {
            debug!(error = %e, "Connectivity probe failed");
            false
          }
        };

        match weak.upgrade() {
          Some(tx) => Connectivity { tx }.set_online(online),
          None => break,
        }
      }
    })
  }
}
