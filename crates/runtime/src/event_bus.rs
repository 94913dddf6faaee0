use crate::setup::SetupStage;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Succeeded,
    Failed,
    Note,
}

/// One entry of the setup diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub stage: SetupStage,
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, stage: SetupStage, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            EventKind::Failed => tracing::error!(stage = stage.name(), "{message}"),
            EventKind::Note => tracing::warn!(stage = stage.name(), "{message}"),
            _ => tracing::info!(stage = stage.name(), ?kind, "{message}"),
        }
        self.events.push(Event {
            stage,
            kind,
            message,
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind};
    use crate::setup::SetupStage;

    #[test]
    fn records_events_with_stage() {
        let mut bus = EventBus::new();
        bus.emit(SetupStage::Camera, EventKind::Started, "hello");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].stage, SetupStage::Camera);
        assert_eq!(bus.events()[0].message, "hello");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(SetupStage::LoadCities, EventKind::Failed, "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, EventKind::Failed);
        assert!(bus.events().is_empty());
    }
}
