//! Core aggregate and domain event traits.

use serde::{Serialize, de::DeserializeOwned};
use store::Version;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, recorded on the lifecycle's trace events.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates persisted as versioned documents.
///
/// Command methods on the aggregate check preconditions against the current
/// state and return the events to record. `apply` folds an event into the
/// state and is the only place state changes:
/// - Given the same state and event, it must always produce the same new state
/// - It must not have side effects
/// - It must not fail (events represent facts that have happened)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name, recorded when the repository saves.
    fn aggregate_type() -> &'static str;

    /// Returns the version the aggregate was loaded at.
    ///
    /// [`Version::initial`] for an aggregate that has not been persisted.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the repository after a successful write.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
