use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cmdflow::{
    Command, CommandEvent, CommandEventKind, CommandEvents, CommandId, CommandResult, CommandType,
    DataScope, DefaultLifecycle, Instance, Lifecycle, ResultStatus, Result,
};

const ALL_KINDS: [CommandEventKind; 5] = [
    CommandEventKind::Completed,
    CommandEventKind::Failed,
    CommandEventKind::Cancelled,
    CommandEventKind::Suspended,
    CommandEventKind::Resumed,
];

/// Records every event dispatched by one command.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<CommandEvent>>>,
}

impl EventRecorder {
    pub fn attach(events: &CommandEvents) -> Self {
        let recorder = Self::default();
        for kind in ALL_KINDS {
            let sink = Arc::clone(&recorder.events);
            events.on(kind, move |e: &CommandEvent| sink.lock().unwrap().push(e.clone()));
        }
        recorder
    }

    pub fn events(&self) -> Vec<CommandEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CommandEventKind> {
        use cmdflow::event::Event;
        self.events().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: CommandEventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    /// Result of the last terminal event.
    pub fn last_result(&self) -> Option<CommandResult> {
        self.events()
            .iter()
            .rev()
            .find_map(|e| e.result().cloned())
    }
}

/// Lifecycle hook that counts calls per command and delegates instantiation
/// to a [`DefaultLifecycle`].
#[derive(Debug, Default)]
pub struct RecordingLifecycle {
    factories: DefaultLifecycle,
    before: Mutex<Vec<CommandId>>,
    after: Mutex<Vec<(CommandId, ResultStatus)>>,
}

impl RecordingLifecycle {
    pub fn new(factories: DefaultLifecycle) -> Self {
        Self {
            factories,
            ..Self::default()
        }
    }

    pub fn before_calls(&self) -> Vec<CommandId> {
        self.before.lock().unwrap().clone()
    }

    pub fn after_calls(&self) -> Vec<(CommandId, ResultStatus)> {
        self.after.lock().unwrap().clone()
    }

    pub fn before_count(&self, id: CommandId) -> usize {
        self.before_calls().iter().filter(|c| **c == id).count()
    }

    pub fn after_count(&self, id: CommandId) -> usize {
        self.after_calls().iter().filter(|(c, _)| *c == id).count()
    }

    /// Status passed to `after_completion` per command.
    pub fn statuses(&self) -> HashMap<CommandId, ResultStatus> {
        self.after_calls().into_iter().collect()
    }
}

impl Lifecycle for RecordingLifecycle {
    fn create_instance(&self, ty: &CommandType, data: &DataScope) -> Result<Option<Instance>> {
        self.factories.create_instance(ty, data)
    }

    fn before_execution(&self, command: &dyn Command, _data: &DataScope) {
        self.before.lock().unwrap().push(command.id());
    }

    fn after_completion(&self, command: &dyn Command, result: &CommandResult) {
        self.after
            .lock()
            .unwrap()
            .push((command.id(), result.status()));
    }
}
