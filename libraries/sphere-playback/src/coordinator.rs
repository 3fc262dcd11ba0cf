//! Instance registry
//!
//! One [`Coordinator`] per page, shared by reference (`Rc`) with every
//! session. It is the only page-wide mutable state: sessions never reach
//! into each other, they go through the registered [`ControlHandle`]s.
//!
//! Handles are collected before they are invoked, so a handle may call back
//! into the coordinator without tripping over a live borrow.

use crate::types::InstanceId;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// What the coordinator may ask of a registered instance
pub trait ControlHandle {
    fn pause(&self);

    fn play(&self);

    /// Show the control overlay temporarily
    fn show_controls(&self);

    /// Hide the control overlay until restored
    fn hide_controls(&self);

    /// Undo [`ControlHandle::hide_controls`]
    fn restore_controls(&self);
}

#[derive(Default)]
struct Registry {
    /// Registration order
    entries: Vec<(InstanceId, Rc<dyn ControlHandle>)>,
    fullscreen: Option<InstanceId>,
}

impl Registry {
    fn others(&self, id: &InstanceId) -> Vec<Rc<dyn ControlHandle>> {
        self.entries
            .iter()
            .filter(|(entry, _)| entry != id)
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    fn handle(&self, id: &InstanceId) -> Option<Rc<dyn ControlHandle>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, handle)| handle.clone())
    }
}

/// Page-wide registry enforcing single playback and single fullscreen
#[derive(Default)]
pub struct Coordinator {
    registry: RefCell<Registry>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Coordinator")
            .field("instances", &self.ids())
            .field("fullscreen", &registry.fullscreen)
            .finish()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handle of an instance
    pub fn register(&self, id: InstanceId, handle: Rc<dyn ControlHandle>) {
        let mut registry = self.registry.borrow_mut();
        if let Some(entry) = registry.entries.iter_mut().find(|(entry, _)| *entry == id) {
            debug!(instance = %id, "Replacing registered instance");
            entry.1 = handle;
        } else {
            debug!(instance = %id, "Registering instance");
            registry.entries.push((id, handle));
        }
    }

    /// Remove an instance; clears the fullscreen record if it pointed at it
    pub fn unregister(&self, id: &InstanceId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| entry != id);
        if registry.fullscreen.as_ref() == Some(id) {
            registry.fullscreen = None;
        }
        let removed = registry.entries.len() != before;
        if removed {
            debug!(instance = %id, "Unregistered instance");
        }
        removed
    }

    /// Record fullscreen entry or exit of `id`
    ///
    /// Entering hides every other overlay and shows the entering instance's;
    /// exiting (only by the recorded instance) restores the others.
    pub fn set_fullscreen(&self, id: &InstanceId, fullscreen: bool) {
        let (own, others) = {
            let mut registry = self.registry.borrow_mut();
            if fullscreen {
                registry.fullscreen = Some(id.clone());
            } else if registry.fullscreen.as_ref() == Some(id) {
                registry.fullscreen = None;
            } else {
                return;
            }
            (registry.handle(id), registry.others(id))
        };

        if fullscreen {
            debug!(instance = %id, "Instance entered fullscreen");
            for handle in &others {
                handle.hide_controls();
            }
            if let Some(own) = own {
                own.show_controls();
            }
        } else {
            debug!(instance = %id, "Instance left fullscreen");
            for handle in &others {
                handle.restore_controls();
            }
        }
    }

    /// Pause every registered instance except `id`
    pub fn pause_all_except(&self, id: &InstanceId) {
        let others = self.registry.borrow().others(id);
        debug!(instance = %id, paused = others.len(), "Pausing other instances");
        for handle in &others {
            handle.pause();
        }
    }

    /// Route a temporary overlay show to one instance
    pub fn show_controls(&self, id: &InstanceId) -> bool {
        let handle = self.registry.borrow().handle(id);
        match handle {
            Some(handle) => {
                handle.show_controls();
                true
            }
            None => false,
        }
    }

    /// The recorded fullscreen instance, if any
    pub fn fullscreen_instance(&self) -> Option<InstanceId> {
        self.registry.borrow().fullscreen.clone()
    }

    pub fn is_registered(&self, id: &InstanceId) -> bool {
        self.registry.borrow().handle(id).is_some()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<InstanceId> {
        self.registry
            .borrow()
            .entries
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.borrow().entries.is_empty()
    }
}
