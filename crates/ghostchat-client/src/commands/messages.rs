use std::sync::Arc;

use tracing::info;

use ghostchat_shared::constants::GLOBAL_ROOM_ID;
use ghostchat_shared::{ExternalBlob, Message, MessageId};

use crate::client::ChatClient;
use crate::error::Result;
use crate::mutation::{run_mutation, MutationSpec};
use crate::poll::{observe, QueryWatch};
use crate::query::QueryKey;

impl ChatClient {
    async fn load_global_messages(&self) -> Result<Vec<Message>> {
        // Always the full history.
        Ok(self.actor()?.fetch_global_messages(0).await?)
    }

    /// Last fetched global messages, if any.
    pub fn global_messages(&self) -> Option<Arc<Vec<Message>>> {
        self.queries.cached(&QueryKey::GlobalMessages)
    }

    pub async fn fetch_global_messages(&self) -> Result<Arc<Vec<Message>>> {
        let load = self.loader(|c: ChatClient| async move { c.load_global_messages().await });
        self.queries.fetch(QueryKey::GlobalMessages, load).await
    }

    /// Poll the global room every `poll_interval` while the watch lives.
    pub fn watch_global_messages(&self) -> QueryWatch<Vec<Message>> {
        let load = self.loader(|c: ChatClient| async move { c.load_global_messages().await });
        observe(
            self.queries.clone(),
            QueryKey::GlobalMessages,
            Some(self.config.poll_interval),
            load,
        )
    }

    pub async fn send_message(&self, content: &str, attachment: Option<ExternalBlob>) -> Result<()> {
        let spec = MutationSpec::new("sendMessage", "Failed to send message")
            .invalidates(QueryKey::GlobalMessages);
        let has_attachment = attachment.is_some();
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.send_message,
            spec,
            async {
                self.actor()?
                    .send_message(GLOBAL_ROOM_ID, content, attachment)
                    .await?;
                info!(room = GLOBAL_ROOM_ID, has_attachment, "Message sent");
                Ok(())
            },
        )
        .await
    }

    pub async fn send_message_with_attachments(
        &self,
        content: &str,
        attachments: Vec<ExternalBlob>,
    ) -> Result<()> {
        let spec = MutationSpec::new("sendMessageWithAttachments", "Failed to send message")
            .invalidates(QueryKey::GlobalMessages);
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.send_message,
            spec,
            async {
                Ok(self
                    .actor()?
                    .send_message_with_attachments(GLOBAL_ROOM_ID, content, attachments)
                    .await?)
            },
        )
        .await
    }

    /// Edit one of the caller's messages. Empty content leaves the text as
    /// is. Returns whether the message was found.
    pub async fn update_message(
        &self,
        id: MessageId,
        new_content: Option<&str>,
        new_attachment: Option<ExternalBlob>,
    ) -> Result<bool> {
        let new_content = new_content.filter(|c| !c.is_empty()).map(str::to_string);
        let spec = MutationSpec::new("updateMessage", "Failed to update message")
            .invalidates(QueryKey::GlobalMessages)
            .on_success("Message updated");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.update_message,
            spec,
            async {
                Ok(self
                    .actor()?
                    .update_message(GLOBAL_ROOM_ID, id, new_content, new_attachment)
                    .await?)
            },
        )
        .await
    }

    pub async fn delete_message(&self, id: MessageId) -> Result<()> {
        let spec = MutationSpec::new("deleteMessage", "Failed to delete message")
            .invalidates(QueryKey::GlobalMessages)
            .on_success("Message deleted");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.delete_message,
            spec,
            async { Ok(self.actor()?.delete_global_message(id).await?) },
        )
        .await
    }
}
