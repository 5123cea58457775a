use tileworld_common::TickContext;

use crate::service::{ScriptHost, ServiceError};

/// One event delivered to the script host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Script host that only records what it is given.
#[derive(Debug, Default)]
pub struct EventLogScriptHost {
    events: Vec<ScriptEvent>,
    ticks: u64,
    running: bool,
}

impl EventLogScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of script ticks run.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ScriptEvent> {
        self.events.iter().filter(move |e| e.name == name)
    }

    pub fn drain_events(&mut self) -> Vec<ScriptEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ScriptHost for EventLogScriptHost {
    fn initialize(&mut self) -> Result<(), ServiceError> {
        if self.running {
            return Err(ServiceError::AlreadyRunning);
        }
        self.running = true;
        tracing::info!("script host started");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
        tracing::info!(events = self.events.len(), "script host stopped");
    }

    fn tick(&mut self, _ctx: &TickContext) {
        self.ticks += 1;
    }

    fn dispatch_event(&mut self, name: &str, payload: &[u8]) {
        tracing::debug!(name, bytes = payload.len(), "script event");
        self.events.push(ScriptEvent {
            name: name.to_owned(),
            payload: payload.to_vec(),
        });
    }
}
