//! Sending configuration repository

use crate::backend::{decode, encode, Backend, Query, ResourceKind};
use crate::models::{SendingConfiguration, SendingConfigurationForm};
use crate::repository::row_with;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wadispatch_common::types::CampaignId;
use wadispatch_common::{Error, Result};

/// One pacing policy per campaign
#[derive(Clone)]
pub struct SendingConfigurationRepository {
    backend: Arc<dyn Backend>,
}

impl SendingConfigurationRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, campaign_id: CampaignId) -> Result<Option<SendingConfiguration>> {
        self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::SendingConfigurations,
                &Query::new().eq("campaign_id", campaign_id).limit(1),
            )
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Update the campaign's configuration, creating it when absent
    pub async fn upsert(
        &self,
        campaign_id: CampaignId,
        form: &SendingConfigurationForm,
    ) -> Result<SendingConfiguration> {
        self.backend.require_user()?;

        let existing = self
            .backend
            .list(
                ResourceKind::SendingConfigurations,
                &Query::new().eq("campaign_id", campaign_id).limit(1),
            )
            .await?;

        let row = match existing.first().and_then(|row| row.get("id")) {
            Some(id) => {
                let id: Uuid = serde_json::from_value(id.clone())
                    .map_err(|e| Error::Backend(format!("Invalid sending configuration id: {}", e)))?;
                self.backend
                    .update(ResourceKind::SendingConfigurations, id, encode(form)?)
                    .await?
            }
            None => {
                let row = row_with(form, &[("campaign_id", json!(campaign_id))])?;
                self.backend
                    .create(ResourceKind::SendingConfigurations, row)
                    .await?
            }
        };

        decode(row)
    }

    pub async fn delete_for_campaign(&self, campaign_id: CampaignId) -> Result<()> {
        self.backend.require_user()?;
        self.backend
            .delete_matching(
                ResourceKind::SendingConfigurations,
                &Query::new().eq("campaign_id", campaign_id),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_upsert_keeps_a_single_row() {
        let backend = Arc::new(MemoryBackend::new().with_user(Uuid::new_v4()));
        let repo = SendingConfigurationRepository::new(backend.clone());
        let campaign_id = Uuid::new_v4();

        assert!(repo.get(campaign_id).await.unwrap().is_none());

        let created = repo
            .upsert(campaign_id, &SendingConfigurationForm::default())
            .await
            .unwrap();
        assert_eq!(created.min_delay_seconds, 5);

        let form = SendingConfigurationForm {
            min_delay_seconds: 8,
            max_delay_seconds: 20,
            daily_limit: Some(500),
            ..Default::default()
        };
        let updated = repo.upsert(campaign_id, &form).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(SendingConfigurationForm::from(updated), form);
        assert_eq!(
            backend.rows(ResourceKind::SendingConfigurations).await.len(),
            1
        );

        repo.delete_for_campaign(campaign_id).await.unwrap();
        assert!(repo.get(campaign_id).await.unwrap().is_none());
    }
}
