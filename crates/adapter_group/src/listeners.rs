//! Notification fan-out for a group
//!
//! Every notification is logged at a level matching its kind, then handed to
//! the external listeners. A listener that panics is reported back as a
//! process error from the group.

use std::sync::Arc;

use contracts::{ComponentEvent, ContractError, EventSource, ListenerSet, Notification};
use metrics::counter;
use tracing::{debug, error, info, warn};

pub(crate) struct Notifier {
    group: String,
    listeners: ListenerSet<Notification>,
}

impl Notifier {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn group_source(&self) -> EventSource {
        EventSource::Group {
            name: self.group.clone(),
        }
    }

    /// Raise a notification from the group itself
    pub fn group_status(&self, message: impl Into<String>) {
        self.raise(
            self.group_source(),
            ComponentEvent::StatusMessage(message.into()),
        );
    }

    /// Raise a process error from the group itself
    pub fn group_error(&self, err: ContractError) {
        self.raise(self.group_source(), ComponentEvent::error(err));
    }

    pub fn raise(&self, source: EventSource, event: ComponentEvent) {
        self.log(&source, &event);

        let notification = Notification { source, event };
        let failures = self
            .listeners
            .notify(&notification, notification.event.name());
        let is_error = matches!(notification.event, ComponentEvent::ProcessError(_));

        for failure in failures {
            if is_error {
                // Nowhere left to report
                error!(group = %self.group, error = %failure, "process error listener failed");
            } else {
                self.group_error(failure);
            }
        }
    }

    fn log(&self, source: &EventSource, event: &ComponentEvent) {
        match event {
            ComponentEvent::StatusMessage(message) => {
                info!(group = %self.group, source = %source, "{message}");
            }
            ComponentEvent::ProcessError(err) => {
                counter!(
                    "concentrator_group_errors_total",
                    "group" => self.group.clone(),
                    "kind" => err.kind()
                )
                .increment(1);
                if is_advisory(err) {
                    warn!(group = %self.group, source = %source, error = %err, "process error");
                } else {
                    error!(group = %self.group, source = %source, error = %err, "process error");
                }
            }
            ComponentEvent::EntitiesDiscarded(items) => {
                debug!(group = %self.group, source = %source, count = items.len(), "entities discarded");
            }
            other => {
                debug!(group = %self.group, source = %source, event = other.name(), "notification");
            }
        }
    }
}

fn is_advisory(err: &Arc<ContractError>) -> bool {
    matches!(
        err.as_ref(),
        ContractError::UnknownFrameType { .. } | ContractError::DuplicateTypeRegistration { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listener_panic_reported_as_group_error() {
        let notifier = Notifier::new("inputs");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        notifier.subscribe(|n: &Notification| {
            if matches!(n.event, ComponentEvent::StatusMessage(_)) {
                panic!("bad listener");
            }
        });
        notifier.subscribe(move |n: &Notification| {
            sink.lock().unwrap().push((n.source.clone(), n.event.name()));
        });

        notifier.group_status("hello");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, "StatusMessage");
        assert_eq!(seen[1].1, "ProcessError");
        assert_eq!(seen[1].0, EventSource::Group { name: "inputs".into() });
    }

    #[test]
    fn test_panicking_error_listener_does_not_recurse() {
        let notifier = Notifier::new("inputs");
        notifier.subscribe(|_: &Notification| panic!("always"));

        // Status -> panic -> ProcessError -> panic -> logged only
        notifier.group_status("hello");
        assert_eq!(notifier.listener_count(), 1);
    }
}
