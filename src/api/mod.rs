pub mod auth;
pub mod documents;
pub mod issue;
pub mod server;

use crate::dispatch::Dispatcher;
use crate::state::ConfigStore;

/// Shared state handed to every control-surface handler
#[derive(Clone)]
pub struct ControlState {
    dispatcher: Dispatcher,
}

impl ControlState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &ConfigStore {
        self.dispatcher.store()
    }
}
