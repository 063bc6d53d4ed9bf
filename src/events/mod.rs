//! Outbound event fan-out: per-session publish/subscribe channels carrying
//! transcript updates and lifecycle events to live subscribers.

pub mod broadcaster;
pub mod messages;

pub use broadcaster::EventBroadcaster;
pub use messages::SessionEvent;
