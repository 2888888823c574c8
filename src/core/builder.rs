use std::sync::Arc;

use crate::{
    clock::{Clock, TokioClock},
    core::CoordinatorConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::{coordinator::Coordinator, engine::Engine};

/// Builder for constructing a Coordinator with optional features.
pub struct CoordinatorBuilder {
    cfg: CoordinatorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    clock: Arc<dyn Clock>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: CoordinatorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            clock: Arc::new(TokioClock),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (poller lifecycle, failures, circuit
    /// and environment transitions) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the time source used for intervals, circuit windows, timeouts
    /// and the idle deadline.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds and returns the Coordinator instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for broadcasting
    /// - Scheduling engine (registry + environment monitor)
    /// - Subscriber workers
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Coordinator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        let engine = Arc::new(Engine::new(
            self.clock,
            bus,
            self.cfg.idle_timeout,
            self.cfg.defaults,
        ));

        let coordinator = Arc::new(Coordinator::new_internal(engine, subs));
        coordinator.subscriber_listener();
        coordinator
    }
}
