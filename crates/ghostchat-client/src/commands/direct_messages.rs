use std::sync::Arc;

use tracing::info;

use ghostchat_shared::{
    DirectMessage, DirectMessageStats, DirectMessageSummary, ExternalBlob, UserId,
};

use crate::client::ChatClient;
use crate::error::Result;
use crate::mutation::{run_mutation, MutationSpec};
use crate::poll::{observe, QueryWatch};
use crate::query::QueryKey;

impl ChatClient {
    async fn load_direct_messages(&self, participant: &UserId) -> Result<Vec<DirectMessage>> {
        let thread = self.actor()?.get_direct_message_thread(participant).await?;
        // A conversation that never started is just empty.
        Ok(thread.unwrap_or_default())
    }

    async fn load_threads(&self) -> Result<Vec<DirectMessageSummary>> {
        Ok(self.actor()?.get_direct_message_threads_stats().await?)
    }

    pub fn direct_messages(&self, participant: &UserId) -> Option<Arc<Vec<DirectMessage>>> {
        self.queries
            .cached(&QueryKey::DirectMessages(participant.clone()))
    }

    pub async fn fetch_direct_messages(
        &self,
        participant: &UserId,
    ) -> Result<Arc<Vec<DirectMessage>>> {
        let peer = participant.clone();
        let load = self.loader(move |c: ChatClient| {
            let peer = peer.clone();
            async move { c.load_direct_messages(&peer).await }
        });
        self.queries
            .fetch(QueryKey::DirectMessages(participant.clone()), load)
            .await
    }

    /// Poll one conversation while the watch lives.
    pub fn watch_direct_messages(&self, participant: &UserId) -> QueryWatch<Vec<DirectMessage>> {
        let peer = participant.clone();
        let load = self.loader(move |c: ChatClient| {
            let peer = peer.clone();
            async move { c.load_direct_messages(&peer).await }
        });
        observe(
            self.queries.clone(),
            QueryKey::DirectMessages(participant.clone()),
            Some(self.config.poll_interval),
            load,
        )
    }

    pub async fn direct_message_threads(&self) -> Result<Arc<Vec<DirectMessageSummary>>> {
        let load = self.loader(|c: ChatClient| async move { c.load_threads().await });
        self.queries.ensure(QueryKey::DirectMessageThreads, load).await
    }

    /// Thread summaries, refreshed when a direct message is sent.
    pub fn watch_direct_message_threads(&self) -> QueryWatch<Vec<DirectMessageSummary>> {
        let load = self.loader(|c: ChatClient| async move { c.load_threads().await });
        observe(self.queries.clone(), QueryKey::DirectMessageThreads, None, load)
    }

    /// Uncached read of one conversation with its counters.
    pub async fn direct_message_stats(&self, participant: &UserId) -> Result<DirectMessageStats> {
        Ok(self
            .actor()?
            .get_direct_messages_with_stats(participant)
            .await?)
    }

    /// Uncached read of every conversation `user` takes part in.
    pub async fn all_direct_message_stats(&self, user: &UserId) -> Result<DirectMessageStats> {
        Ok(self.actor()?.get_all_direct_messages_stats(user).await?)
    }

    pub async fn send_direct_message(
        &self,
        receiver: &UserId,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> Result<()> {
        let spec = MutationSpec::new("sendDirectMessage", "Failed to send message")
            .invalidates(QueryKey::DirectMessages(receiver.clone()))
            .invalidates(QueryKey::DirectMessageThreads);
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.send_direct_message,
            spec,
            async {
                self.actor()?
                    .send_direct_message(receiver, content, attachment)
                    .await?;
                info!(receiver = %receiver, "Direct message sent");
                Ok(())
            },
        )
        .await
    }
}
