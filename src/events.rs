//! Typed UI notifications.
//!
//! The controller publishes control-surface signals (enable/disable, run
//! button state, device changes) through an explicit observer list rather
//! than direct DOM-style calls, so hosts can wire whatever surface they have.

use crate::experiment::Device;

/// A control-surface signal published by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// All run-configuration controls should be enabled or disabled.
    ControlsEnabled(bool),
    /// The run button should show run or pause affordance.
    RunButton {
        /// Whether the live experiment is paused.
        paused: bool,
    },
    /// The active device changed; variable controls need re-rendering.
    DeviceChanged(Device),
    /// The user pool changed size.
    VariablesChanged {
        /// Whether more variables may be added.
        can_grow: bool,
        /// Whether variables may still be removed.
        can_shrink: bool,
    },
}

type Observer = Box<dyn Fn(&Notification) + Send + Sync>;

/// An ordered list of notification observers.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Observer>,
}

impl ObserverList {
    /// Create an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are invoked in subscription order.
    pub fn subscribe(&mut self, observer: impl Fn(&Notification) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Deliver a notification to every observer.
    pub fn notify(&self, notification: &Notification) {
        for observer in &self.observers {
            observer(notification);
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}
