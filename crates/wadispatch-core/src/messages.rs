//! Message sequence editor

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wadispatch_common::types::ContentType;
use wadispatch_common::Error;
use wadispatch_storage::models::NewCampaignMessage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message content cannot be empty")]
    EmptyContent,

    #[error("a {0} message needs a media URL")]
    MissingMediaUrl(ContentType),

    #[error("no message at position {0}")]
    IndexOutOfRange(usize),
}

impl From<MessageError> for Error {
    fn from(err: MessageError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Ordered campaign messages.
///
/// `order_index` always equals the message's position; it is recomputed
/// after every removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageSequence {
    messages: Vec<NewCampaignMessage>,
}

impl MessageSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    ///
    /// Text messages need a body; media messages need a URL and treat the
    /// body as an optional caption.
    pub fn add(
        &mut self,
        content_type: ContentType,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<&NewCampaignMessage, MessageError> {
        let media_url = media_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        if content_type.is_media() {
            if media_url.is_none() {
                return Err(MessageError::MissingMediaUrl(content_type));
            }
        } else if content.trim().is_empty() {
            return Err(MessageError::EmptyContent);
        }

        let order_index = self.messages.len() as u32;
        self.messages.push(NewCampaignMessage {
            content_type,
            content: content.to_string(),
            media_url,
            order_index,
        });

        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Remove a message and re-index the rest
    pub fn remove(&mut self, index: usize) -> Result<NewCampaignMessage, MessageError> {
        if index >= self.messages.len() {
            return Err(MessageError::IndexOutOfRange(index));
        }
        let removed = self.messages.remove(index);
        self.reindex();
        Ok(removed)
    }

    pub fn update_content(&mut self, index: usize, content: &str) -> Result<(), MessageError> {
        self.get_mut(index)?.content = content.to_string();
        Ok(())
    }

    pub fn update_media_url(&mut self, index: usize, media_url: &str) -> Result<(), MessageError> {
        let media_url = media_url.trim();
        self.get_mut(index)?.media_url = (!media_url.is_empty()).then(|| media_url.to_string());
        Ok(())
    }

    /// Append `{{key}}` to a message body
    pub fn insert_variable(&mut self, index: usize, key: &str) -> Result<(), MessageError> {
        let message = self.get_mut(index)?;
        message.content.push_str("{{");
        message.content.push_str(key);
        message.content.push_str("}}");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NewCampaignMessage> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NewCampaignMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[NewCampaignMessage] {
        &self.messages
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut NewCampaignMessage, MessageError> {
        self.messages
            .get_mut(index)
            .ok_or(MessageError::IndexOutOfRange(index))
    }

    fn reindex(&mut self) {
        for (i, message) in self.messages.iter_mut().enumerate() {
            message.order_index = i as u32;
        }
    }
}

impl From<Vec<NewCampaignMessage>> for MessageSequence {
    /// Messages are ordered by their stored index, then re-indexed densely
    fn from(mut messages: Vec<NewCampaignMessage>) -> Self {
        messages.sort_by_key(|m| m.order_index);
        let mut sequence = Self { messages };
        sequence.reindex();
        sequence
    }
}

impl<'a> IntoIterator for &'a MessageSequence {
    type Item = &'a NewCampaignMessage;
    type IntoIter = std::slice::Iter<'a, NewCampaignMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sequence_of(contents: &[&str]) -> MessageSequence {
        let mut sequence = MessageSequence::new();
        for content in contents {
            sequence.add(ContentType::Text, content, None).unwrap();
        }
        sequence
    }

    #[test]
    fn test_add_assigns_order_index() {
        let sequence = sequence_of(&["a", "b", "c"]);
        let indexes: Vec<_> = sequence.iter().map(|m| m.order_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut sequence = sequence_of(&["a", "b", "c"]);

        let removed = sequence.remove(1).unwrap();
        assert_eq!(removed.content, "b");

        let remaining: Vec<_> = sequence
            .iter()
            .map(|m| (m.order_index, m.content.as_str()))
            .collect();
        assert_eq!(remaining, vec![(0, "a"), (1, "c")]);

        assert_eq!(
            sequence.remove(2).unwrap_err(),
            MessageError::IndexOutOfRange(2)
        );
    }

    #[test]
    fn test_add_validation() {
        let mut sequence = MessageSequence::new();

        assert_eq!(
            sequence.add(ContentType::Text, "   ", None).unwrap_err(),
            MessageError::EmptyContent
        );
        assert_eq!(
            sequence.add(ContentType::Image, "caption", Some(" ")).unwrap_err(),
            MessageError::MissingMediaUrl(ContentType::Image)
        );

        let media = sequence
            .add(ContentType::Document, "", Some("https://cdn.example.com/menu.pdf"))
            .unwrap();
        assert_eq!(media.content, "");
        assert_eq!(
            media.media_url.as_deref(),
            Some("https://cdn.example.com/menu.pdf")
        );
        assert_eq!(
            MessageError::MissingMediaUrl(ContentType::Video).to_string(),
            "a video message needs a media URL"
        );
    }

    #[test]
    fn test_edit_operations() {
        let mut sequence = sequence_of(&["Olá "]);

        sequence.insert_variable(0, "nome").unwrap();
        assert_eq!(sequence.get(0).unwrap().content, "Olá {{nome}}");

        sequence.update_content(0, "Oi").unwrap();
        sequence.update_media_url(0, "  ").unwrap();
        assert_eq!(sequence.get(0).unwrap().content, "Oi");
        assert_eq!(sequence.get(0).unwrap().media_url, None);

        assert!(sequence.update_content(3, "x").is_err());
    }

    #[test]
    fn test_from_stored_messages() {
        let stored = vec![
            NewCampaignMessage {
                content: "second".to_string(),
                order_index: 4,
                ..Default::default()
            },
            NewCampaignMessage {
                content: "first".to_string(),
                order_index: 1,
                ..Default::default()
            },
        ];

        let sequence = MessageSequence::from(stored);
        let view: Vec<_> = sequence
            .iter()
            .map(|m| (m.order_index, m.content.as_str()))
            .collect();
        assert_eq!(view, vec![(0, "first"), (1, "second")]);
    }
}
