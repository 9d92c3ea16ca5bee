//! Single-instance lifecycle guard around a controller.
//!
//! The transport layer never builds controllers directly; it goes through
//! this container, which holds zero or one live instance and the factory
//! to build one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::controller::Controller;
use crate::error::ContainerError;

/// Builds a fresh controller, sinks and timer included.
pub type ControllerFactory = Box<dyn Fn() -> Arc<Controller> + Send + Sync>;

/// Create-once, get, remove.
///
/// Reads run concurrently with each other but exclusively with create and
/// remove. Removing does not cancel a running wait -- call
/// [`Controller::stop`] first for a clean shutdown.
pub struct SingleControllerContainer {
    factory: ControllerFactory,
    controller: RwLock<Option<Arc<Controller>>>,
}

impl SingleControllerContainer {
    pub fn new(factory: ControllerFactory) -> Self {
        Self {
            factory,
            controller: RwLock::new(None),
        }
    }

    /// Build and store a controller. Fails if one is already held.
    pub fn create(&self) -> Result<Arc<Controller>, ContainerError> {
        let mut slot = self
            .controller
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ContainerError::ExistingController);
        }
        let controller = (self.factory)();
        *slot = Some(Arc::clone(&controller));
        Ok(controller)
    }

    /// The held controller, if any.
    pub fn get(&self) -> Result<Arc<Controller>, ContainerError> {
        self.controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .cloned()
            .ok_or(ContainerError::NoController)
    }

    /// Drop the held reference.
    pub fn remove(&self) -> Result<(), ContainerError> {
        self.controller
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(drop)
            .ok_or(ContainerError::NoController)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerConfig;
    use crate::events::EventSinks;
    use crate::session::PhaseDurations;
    use crate::timer::MockTimer;
    use std::num::NonZeroU32;

    fn container() -> SingleControllerContainer {
        SingleControllerContainer::new(Box::new(|| {
            Controller::new(ControllerConfig {
                cadence: NonZeroU32::new(4).unwrap(),
                durations: PhaseDurations::default(),
                timer: Arc::new(MockTimer::new()),
                sinks: EventSinks::default(),
            })
        }))
    }

    #[test]
    fn get_and_remove_require_a_controller() {
        let container = container();
        assert_eq!(container.get().err(), Some(ContainerError::NoController));
        assert_eq!(container.remove().err(), Some(ContainerError::NoController));
    }

    #[test]
    fn create_twice_fails_until_removed() {
        let container = container();
        container.create().unwrap();
        assert_eq!(
            container.create().err(),
            Some(ContainerError::ExistingController)
        );
        container.remove().unwrap();
        container.create().unwrap();
    }

    #[test]
    fn get_returns_the_held_instance() {
        let container = container();
        let created = container.create().unwrap();
        let fetched = container.get().unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
    }
}
