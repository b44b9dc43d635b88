use std::sync::Arc;

use tracing::{debug, warn};

use ghostchat_shared::ExternalBlob;

use crate::client::ChatClient;
use crate::error::Result;
use crate::mutation::{run_mutation, MutationSpec};
use crate::poll::{observe, QueryWatch};
use crate::query::QueryKey;

impl ChatClient {
    async fn load_site_logo(&self) -> Result<String> {
        let logo = self.actor()?.get_site_logo().await?;
        let url = logo
            .as_ref()
            .and_then(ExternalBlob::direct_url)
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_logo_url.clone());
        self.logo_cache.set(&url);
        Ok(url)
    }

    /// URL to paint before the backend answers: the cached query value,
    /// then the durable mirror, then the default logo.
    pub fn initial_logo_url(&self) -> String {
        if let Some(url) = self.queries.cached::<String>(&QueryKey::SiteLogo) {
            return url.as_ref().clone();
        }
        self.logo_cache
            .get()
            .unwrap_or_else(|| self.config.default_logo_url.clone())
    }

    pub async fn site_logo_url(&self) -> Result<Arc<String>> {
        let load = self.loader(|c: ChatClient| async move { c.load_site_logo().await });
        self.queries.ensure(QueryKey::SiteLogo, load).await
    }

    pub fn watch_site_logo(&self) -> QueryWatch<String> {
        let load = self.loader(|c: ChatClient| async move { c.load_site_logo().await });
        observe(self.queries.clone(), QueryKey::SiteLogo, None, load)
    }

    /// Replace the site logo. The new URL is mirrored to durable storage
    /// and the query cache, then preloaded; the mutation stays pending
    /// until the preload settles.
    pub async fn set_site_logo(&self, logo: ExternalBlob) -> Result<ExternalBlob> {
        let spec = MutationSpec::new("setSiteLogo", "Failed to update site logo")
            .on_success("Site logo updated successfully");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.set_site_logo,
            spec,
            async {
                let stored = self.actor()?.set_site_logo(logo).await?;
                match stored.direct_url() {
                    Some(url) => {
                        self.logo_cache.set(url);
                        self.queries.set_data(QueryKey::SiteLogo, url.to_string());
                        self.preload_logo(url).await;
                    }
                    None => self.queries.invalidate(&QueryKey::SiteLogo),
                }
                Ok(stored)
            },
        )
        .await
    }

    async fn preload_logo(&self, url: &str) {
        match tokio::time::timeout(self.config.preload_timeout, self.preloader.preload(url)).await {
            Ok(Ok(())) => debug!(url, "Site logo preloaded"),
            Ok(Err(e)) => warn!(url, error = %e, "Site logo preload failed"),
            Err(_) => warn!(url, "Site logo preload timed out"),
        }
    }
}
