//! In-memory executor for tests.
//!
//! Records every command instead of touching the system, answers
//! `-listnetworkserviceorder` with a canned listing, and fails whichever
//! commands match a registered predicate.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::command::{CommandExecutor, NetworkCommand};
use crate::error::ExecutionError;

type FailurePredicate = Box<dyn Fn(&NetworkCommand) -> bool + Send + Sync>;

/// A fake [`CommandExecutor`] that records calls.
pub struct RecordingExecutor {
    listing: String,
    commands: Mutex<Vec<NetworkCommand>>,
    failures: Mutex<Vec<FailurePredicate>>,
}

impl RecordingExecutor {
    /// Answers the service listing with `listing` verbatim.
    pub fn with_listing(listing: impl Into<String>) -> Self {
        Self {
            listing: listing.into(),
            commands: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Answers the service listing with the given services, in order.
    pub fn with_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut listing =
            String::from("An asterisk (*) denotes that a network service is disabled.\n");
        for (index, service) in services.into_iter().enumerate() {
            let service = service.as_ref();
            listing.push_str(&format!(
                "({}) {}\n(Hardware Port: {}, Device: en{})\n\n",
                index + 1,
                service,
                service,
                index
            ));
        }
        Self::with_listing(listing)
    }

    /// Fails every command matching `predicate`.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&NetworkCommand) -> bool + Send + Sync + 'static,
    {
        self.failures.lock().push(Box::new(predicate));
    }

    /// Fails every command aimed at `service`.
    pub fn fail_service(&self, service: &str) {
        let service = service.to_string();
        self.fail_when(move |cmd| cmd.service().is_some_and(|s| s.as_str() == service));
    }

    /// Commands executed so far, in order.
    pub fn commands(&self) -> Vec<NetworkCommand> {
        self.commands.lock().clone()
    }

    /// Commands executed so far for one service.
    pub fn commands_for(&self, service: &str) -> Vec<NetworkCommand> {
        self.commands
            .lock()
            .iter()
            .filter(|cmd| cmd.service().is_some_and(|s| s.as_str() == service))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, command: &NetworkCommand) -> Result<String, ExecutionError> {
        self.commands.lock().push(command.clone());

        if self.failures.lock().iter().any(|fails| fails(command)) {
            return Err(ExecutionError::Failed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }

        match command {
            NetworkCommand::ListServiceOrder => Ok(self.listing.clone()),
            _ => Ok(String::new()),
        }
    }
}
