use std::collections::HashMap;

use crate::models::{Notification, NotificationKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for notification kind {0}")]
    MissingHandler(NotificationKind),
}

/// Per-kind handlers (renderers, icon resolvers, ...) keyed by notification kind.
///
/// Built once at startup; `build` refuses a table that leaves any kind unhandled, so a
/// lookup can never miss at request time.
pub struct DispatchTable<H> {
    handlers: HashMap<NotificationKind, H>,
}

pub struct DispatchTableBuilder<H> {
    handlers: HashMap<NotificationKind, H>,
}

impl<H> DispatchTable<H> {
    pub fn builder() -> DispatchTableBuilder<H> {
        DispatchTableBuilder {
            handlers: HashMap::new(),
        }
    }

    pub fn get(&self, kind: NotificationKind) -> &H {
        // Every kind is present: `build` checked NotificationKind::ALL.
        &self.handlers[&kind]
    }

    pub fn handler_for(&self, notification: &Notification) -> &H {
        self.get(notification.kind())
    }
}

impl<H> DispatchTableBuilder<H> {
    /// Registers `handler` for `kind`, replacing any earlier registration.
    pub fn on(mut self, kind: NotificationKind, handler: H) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn build(self) -> Result<DispatchTable<H>, DispatchError> {
        if let Some(kind) = NotificationKind::ALL
            .into_iter()
            .find(|kind| !self.handlers.contains_key(kind))
        {
            return Err(DispatchError::MissingHandler(kind));
        }
        Ok(DispatchTable {
            handlers: self.handlers,
        })
    }
}
