//! Attach detection by polling enumeration.
//!
//! Only attaches are reported. A removed device fails its open session's
//! read loop, which the link actor already treats as an unplug.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use actor_protocol::ActorError;
use actor_runtime::{actor_debug, actor_warn, LinkHandle};
use core_types::{DeviceDescriptor, SerialProvider};

/// Paths seen on the previous poll.
#[derive(Debug, Default)]
pub struct DeviceSet {
    paths: BTreeSet<String>,
}

impl DeviceSet {
    /// Replace the set with `current` and return the paths that are new.
    pub fn update(&mut self, current: &[DeviceDescriptor]) -> Vec<String> {
        let next: BTreeSet<String> = current.iter().map(|d| d.path.clone()).collect();
        let added = next.difference(&self.paths).cloned().collect();
        self.paths = next;
        added
    }
}

/// Post an owed attach. Returns false once the link actor is gone.
///
/// A full queue keeps the attach owed so the next poll posts it again.
fn deliver_attach(post: impl FnOnce() -> Result<(), ActorError>, owed: &mut bool) -> bool {
    match post() {
        Ok(()) => {
            *owed = false;
            true
        }
        Err(ActorError::QueueFull(reason)) => {
            actor_warn!("Hotplug: attach deferred: {}", reason);
            true
        }
        Err(e) => {
            actor_debug!("Hotplug: {}", e);
            false
        }
    }
}

/// Poll `provider` every `interval` and post `DeviceAttached` when a new
/// device shows up. Ends when the link actor is gone.
pub fn spawn_hotplug_watcher(
    provider: Arc<dyn SerialProvider>,
    link: LinkHandle,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut known = DeviceSet::default();
        let mut first_poll = true;
        let mut attach_owed = false;
        loop {
            let provider = provider.clone();
            let listed = tokio::task::spawn_blocking(move || provider.list()).await;
            match listed {
                Ok(Ok(devices)) => {
                    let added = known.update(&devices);
                    // The initial scan is the baseline; startup auto-connect covers it
                    if !first_poll && !added.is_empty() {
                        actor_debug!("Hotplug: attached {:?}", added);
                        attach_owed = true;
                    }
                    first_poll = false;
                }
                Ok(Err(e)) => actor_debug!("Hotplug: enumeration failed: {}", e),
                Err(e) => actor_debug!("Hotplug: enumeration task failed: {}", e),
            }
            if attach_owed && !deliver_attach(|| link.device_attached(), &mut attach_owed) {
                break;
            }
            tokio::time::sleep(interval).await;
        }
        actor_debug!("Hotplug watcher stopped");
    })
}
