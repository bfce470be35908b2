pub mod events;
pub mod notifications;
pub mod parking;

// Re-export key types for convenience
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use notifications::{spawn_notification_forwarder, LoggingSink, NotificationSink};
pub use parking::{EngineConfig, LotView, ParkingEngine, SpotDetail};
