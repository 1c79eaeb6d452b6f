//! Read-only summary shown on the review step

use crate::estimator::CampaignEstimate;
use crate::wizard::CampaignDraft;
use serde::Serialize;
use wadispatch_storage::models::{
    ApiConfiguration, NewCampaignContact, NewCampaignMessage, SendingConfigurationForm,
};

/// Contacts listed on the review step before "and N more"
pub const CONTACT_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewMessage {
    pub order_index: u32,
    pub type_label: &'static str,
    pub content: String,
    pub media_url: Option<String>,
}

impl From<&NewCampaignMessage> for ReviewMessage {
    fn from(m: &NewCampaignMessage) -> Self {
        use wadispatch_common::types::ContentType;

        let type_label = match m.content_type {
            ContentType::Text => "Text",
            ContentType::Image => "Image",
            ContentType::Video => "Video",
            ContentType::Audio => "Audio",
            ContentType::Document => "Document",
        };

        Self {
            order_index: m.order_index,
            type_label,
            content: m.content.clone(),
            media_url: m.media_url.clone(),
        }
    }
}

/// Everything the review step displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub campaign_name: String,
    /// Name of the selected API configuration, if it is still known
    pub api_name: Option<String>,
    pub api_type_label: Option<&'static str>,
    pub google_sheets_url: Option<String>,
    pub sheet_id_column: String,

    pub contact_count: usize,
    pub contacts_with_name: usize,
    pub contacts_with_external_id: usize,
    pub contacts_with_custom_fields: usize,
    pub contact_sample: Vec<NewCampaignContact>,
    pub remaining_contacts: usize,

    pub messages: Vec<ReviewMessage>,
    pub sending: SendingConfigurationForm,
    pub estimate: CampaignEstimate,
    pub estimated_duration: String,
}

impl ReviewSummary {
    pub fn build(draft: &CampaignDraft, api_configs: &[ApiConfiguration]) -> Self {
        let selected = draft
            .basic
            .api_config_id
            .and_then(|id| api_configs.iter().find(|c| c.id == id));

        let contacts = draft.contacts.as_slice();
        let estimate = draft.estimate();

        Self {
            campaign_name: draft.basic.name.clone(),
            api_name: selected.map(|c| c.name.clone()),
            api_type_label: selected.map(|c| c.api_type.label()),
            google_sheets_url: draft.basic.google_sheets_url.clone(),
            sheet_id_column: draft.basic.sheet_id_column.clone(),

            contact_count: contacts.len(),
            contacts_with_name: contacts.iter().filter(|c| c.name.is_some()).count(),
            contacts_with_external_id: contacts
                .iter()
                .filter(|c| c.external_id.is_some())
                .count(),
            contacts_with_custom_fields: contacts
                .iter()
                .filter(|c| !c.custom_fields.is_empty())
                .count(),
            contact_sample: contacts.iter().take(CONTACT_SAMPLE_SIZE).cloned().collect(),
            remaining_contacts: contacts.len().saturating_sub(CONTACT_SAMPLE_SIZE),

            messages: draft.messages.iter().map(ReviewMessage::from).collect(),
            sending: draft.sending.clone(),
            estimated_duration: estimate.formatted(),
            estimate,
        }
    }
}
