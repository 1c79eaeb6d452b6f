//! Template Renderer - Handles personalization of message content

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use wadispatch_storage::models::{NewCampaignContact, NewCampaignMessage};

/// Placeholder for the contact name
pub const NAME_KEY: &str = "nome";
/// Placeholder for the normalized phone number
pub const PHONE_KEY: &str = "telefone";
/// Placeholder for the external id
pub const ID_KEY: &str = "id";

/// Name used when a contact has none
pub const DEFAULT_NAME: &str = "Cliente";

/// A variable that may be inserted into a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub key: String,
    pub label: String,
    pub example: String,
}

impl TemplateVariable {
    fn new(key: &str, label: &str, example: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            example: example.to_string(),
        }
    }

    /// `{{key}}` form of the variable
    pub fn placeholder(&self) -> String {
        format!("{{{{{}}}}}", self.key)
    }
}

/// Variables offered to the message editor: the built-ins followed by
/// every custom field key present in `contacts`, sorted
pub fn available_variables<'a>(
    contacts: impl IntoIterator<Item = &'a NewCampaignContact>,
) -> Vec<TemplateVariable> {
    let mut variables = vec![
        TemplateVariable::new(NAME_KEY, "Name", "João Silva"),
        TemplateVariable::new(PHONE_KEY, "Phone", "5511912345678"),
        TemplateVariable::new(ID_KEY, "ID", "123"),
    ];

    let mut custom: BTreeMap<&str, &str> = BTreeMap::new();
    for contact in contacts {
        for (key, value) in &contact.custom_fields {
            custom.entry(key.as_str()).or_insert(value.as_str());
        }
    }

    variables.extend(
        custom
            .into_iter()
            .map(|(key, example)| TemplateVariable::new(key, key, example)),
    );
    variables
}

/// Keys of every `{{key}}` token in `body`, in order of first appearance
pub fn placeholders(body: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };

        let key = &after[..end];
        if key.is_empty() || key.contains('{') {
            rest = &rest[start + 1..];
            continue;
        }
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
        rest = &after[end + 2..];
    }

    keys
}

/// Template renderer for personalizing message content
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    /// Substituted for `{{nome}}` when the contact has no name
    fallback_name: String,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_NAME)
    }
}

impl TemplateRenderer {
    /// Create a new template renderer
    pub fn new(fallback_name: impl Into<String>) -> Self {
        Self {
            fallback_name: fallback_name.into(),
        }
    }

    /// Render a message body for one contact.
    ///
    /// Built-in variables are replaced first (`nome`, `telefone`, `id`),
    /// then each custom field. Keys match case-insensitively and every
    /// occurrence is replaced; unknown placeholders are left as they are.
    pub fn render(&self, body: &str, contact: &NewCampaignContact) -> String {
        let name = contact
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.fallback_name);

        let mut result = replace_placeholder(body, NAME_KEY, name);
        result = replace_placeholder(&result, PHONE_KEY, &contact.phone_number);
        result = replace_placeholder(
            &result,
            ID_KEY,
            contact.external_id.as_deref().unwrap_or_default(),
        );

        for (key, value) in &contact.custom_fields {
            result = replace_placeholder(&result, key, value);
        }

        result
    }

    /// Render every message of a sequence for one contact
    pub fn preview(
        &self,
        messages: &[NewCampaignMessage],
        contact: &NewCampaignContact,
    ) -> Vec<String> {
        messages
            .iter()
            .map(|m| self.render(&m.content, contact))
            .collect()
    }
}

/// Replace every `{{key}}` (any letter case) with `value` taken literally
fn replace_placeholder(body: &str, key: &str, value: &str) -> String {
    let pattern = format!(r"(?i)\{{\{{{}\}}\}}", regex::escape(key));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(body, NoExpand(value)).into_owned(),
        Err(e) => {
            warn!(key, "Skipping placeholder that cannot be matched: {}", e);
            body.to_string()
        }
    }
}
