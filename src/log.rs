use std::slice::Iter;

use crate::types::{Level, Message};

/// Append-only record of everything that happened on the current connection.
///
/// Entries are never modified once appended; the only way to remove them is [`MessageLog::clear`].
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            kind = %message.kind,
            direction = %message.direction,
            event = ?message.event,
            "Appending message"
        );
        self.entries.push(message);
    }

    /// Append a [`MessageKind::Connection`](crate::types::MessageKind::Connection) notice.
    pub fn system<S: Into<String>>(&mut self, level: Level, content: S) {
        self.append(Message::system(level, content));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn all(&self) -> &[Message] {
        &self.entries
    }

    pub fn iter(&self) -> Iter<'_, Message> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'log> IntoIterator for &'log MessageLog {
    type Item = &'log Message;
    type IntoIter = Iter<'log, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
