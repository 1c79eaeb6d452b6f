//! Campaign message repository

use crate::backend::{decode, decode_all, encode, Backend, Order, Query, ResourceKind};
use crate::models::{CampaignMessage, NewCampaignMessage};
use crate::repository::row_with;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use wadispatch_common::types::{CampaignId, MessageId};
use wadispatch_common::Result;

#[derive(Clone)]
pub struct CampaignMessageRepository {
    backend: Arc<dyn Backend>,
}

impl CampaignMessageRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Messages of a campaign in sending order
    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<CampaignMessage>> {
        self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::CampaignMessages,
                &Query::new()
                    .eq("campaign_id", campaign_id)
                    .order_by("order_index", Order::Asc),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn add(
        &self,
        campaign_id: CampaignId,
        message: &NewCampaignMessage,
    ) -> Result<CampaignMessage> {
        self.backend.require_user()?;
        let row = row_with(message, &[("campaign_id", json!(campaign_id))])?;
        decode(
            self.backend
                .create(ResourceKind::CampaignMessages, row)
                .await?,
        )
    }

    pub async fn update(
        &self,
        id: MessageId,
        message: &NewCampaignMessage,
    ) -> Result<CampaignMessage> {
        self.backend.require_user()?;
        decode(
            self.backend
                .update(ResourceKind::CampaignMessages, id, encode(message)?)
                .await?,
        )
    }

    pub async fn delete(&self, id: MessageId) -> Result<()> {
        self.backend.require_user()?;
        self.backend.delete(ResourceKind::CampaignMessages, id).await
    }

    pub async fn delete_for_campaign(&self, campaign_id: CampaignId) -> Result<()> {
        self.backend.require_user()?;
        self.backend
            .delete_matching(
                ResourceKind::CampaignMessages,
                &Query::new().eq("campaign_id", campaign_id),
            )
            .await
    }

    /// Replace the whole sequence of a campaign
    pub async fn replace_all(
        &self,
        campaign_id: CampaignId,
        messages: &[NewCampaignMessage],
    ) -> Result<Vec<CampaignMessage>> {
        self.delete_for_campaign(campaign_id).await?;

        let rows = messages
            .iter()
            .map(|m| row_with(m, &[("campaign_id", json!(campaign_id))]))
            .collect::<Result<Vec<_>>>()?;

        debug!(campaign_id = %campaign_id, count = rows.len(), "Replacing campaign messages");
        decode_all(
            self.backend
                .create_batch(ResourceKind::CampaignMessages, rows)
                .await?,
        )
    }
}
