use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::pipeline::frame_pipeline::FramePipeline;
use crate::streaming::frame_streamer::StreamMode;

use super::door_controller::DoorController;

/// Holds the controller between viewer sessions.
///
/// One viewer at a time checks the controller out. No lock is held while
/// frames are produced; the lease owns the controller outright.
#[derive(Clone)]
pub struct SessionSlot {
    inner: Arc<Mutex<Option<DoorController>>>,
}

impl SessionSlot {
    pub fn new(controller: DoorController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(controller))),
        }
    }

    /// Exclusive access for one viewer, or `None` if a viewer is attached
    /// (or the controller was taken for shutdown).
    pub fn checkout(&self) -> Option<SessionLease> {
        let controller = self.lock().take()?;
        Some(SessionLease {
            slot: Arc::clone(&self.inner),
            controller: Some(controller),
        })
    }

    pub fn is_available(&self) -> bool {
        self.lock().is_some()
    }

    /// Removes the controller for shutdown. Leases returned afterwards put
    /// their controller back, and it is shut down when the slot is dropped.
    pub fn take(&self) -> Option<DoorController> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<DoorController>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A checked-out controller. Returns it to the slot when dropped.
pub struct SessionLease {
    slot: Arc<Mutex<Option<DoorController>>>,
    controller: Option<DoorController>,
}

impl SessionLease {
    pub fn mode(&self) -> StreamMode {
        self.controller().mode()
    }

    fn controller(&self) -> &DoorController {
        self.controller
            .as_ref()
            .expect("lease holds its controller until dropped")
    }
}

impl Deref for SessionLease {
    type Target = FramePipeline;

    fn deref(&self) -> &FramePipeline {
        self.controller()
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut FramePipeline {
        self.controller
            .as_mut()
            .expect("lease holds its controller until dropped")
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take() {
            let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            *guard = Some(controller);
            log::debug!("Viewer session ended, controller returned");
        }
    }
}
