//! Repository layer for data access

pub mod api_configurations;
pub mod campaigns;
pub mod contacts;
pub mod messages;
pub mod sending_configurations;

pub use api_configurations::ApiConfigurationRepository;
pub use campaigns::CampaignRepository;
pub use contacts::CampaignContactRepository;
pub use messages::CampaignMessageRepository;
pub use sending_configurations::SendingConfigurationRepository;

use crate::backend::{encode, Backend};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use wadispatch_common::{Error, Result};

/// Every repository over one backend
#[derive(Clone)]
pub struct Repositories {
    pub campaigns: CampaignRepository,
    pub messages: CampaignMessageRepository,
    pub contacts: CampaignContactRepository,
    pub sending_configurations: SendingConfigurationRepository,
    pub api_configurations: ApiConfigurationRepository,
}

impl Repositories {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            campaigns: CampaignRepository::new(backend.clone()),
            messages: CampaignMessageRepository::new(backend.clone()),
            contacts: CampaignContactRepository::new(backend.clone()),
            sending_configurations: SendingConfigurationRepository::new(backend.clone()),
            api_configurations: ApiConfigurationRepository::new(backend),
        }
    }
}

/// Encode a record and add extra columns to it
pub(crate) fn row_with<T: Serialize>(record: &T, extra: &[(&str, Value)]) -> Result<Value> {
    let mut row = encode(record)?;
    let fields = row
        .as_object_mut()
        .ok_or_else(|| Error::Internal("record did not encode to an object".to_string()))?;
    for (key, value) in extra {
        fields.insert((*key).to_string(), value.clone());
    }
    Ok(row)
}
