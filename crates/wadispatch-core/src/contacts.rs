//! Contact Ingestor - CSV import and manual entry of campaign recipients

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};
use wadispatch_common::Error;
use wadispatch_storage::models::{CustomFields, NewCampaignContact};

/// Minimum number of digits of a valid phone number
pub const MIN_PHONE_DIGITS: usize = 10;

/// Sample file offered for download
pub const CSV_TEMPLATE: &str = "ID,Telefone,Nome,Empresa\n\
1,5511912345678,João Silva,Empresa ABC\n\
2,5511987654321,Maria Santos,Empresa XYZ";

const PHONE_HEADERS: &[&str] = &["telefone", "phone", "numero"];
const NAME_HEADERS: &[&str] = &["nome", "name"];
const ID_HEADERS: &[&str] = &["id"];

/// Strip every non-digit character
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// One rejected row of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    /// 1-indexed line of the file (the header is line 1); 0 for file-level errors
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ImportError {
    fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactImportResult {
    pub success_count: usize,
    /// Rejected data rows; a missing phone column is reported in `errors`
    /// without being counted here
    pub error_count: usize,
    pub errors: Vec<ImportError>,
    pub preview: Vec<NewCampaignContact>,
}

impl ContactImportResult {
    /// The file could not be processed at all
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.row == 0)
    }
}

/// Positions of the recognised columns
struct ColumnMap {
    width: usize,
    phone: usize,
    name: Option<usize>,
    id: Option<usize>,
}

impl ColumnMap {
    fn detect(headers: &[String]) -> Option<Self> {
        let find = |candidates: &[&str]| {
            headers
                .iter()
                .position(|h| candidates.iter().any(|c| h.contains(c)))
        };

        Some(Self {
            width: headers.len(),
            phone: find(PHONE_HEADERS)?,
            name: find(NAME_HEADERS),
            id: find(ID_HEADERS),
        })
    }

    fn is_recognised(&self, index: usize) -> bool {
        index == self.phone || Some(index) == self.name || Some(index) == self.id
    }
}

fn optional_cell(values: &[&str], index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| values.get(i))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Parse comma-separated contact data.
///
/// Every data row yields either one contact or one error; phones repeated
/// within the file are rejected as duplicates.
pub fn parse_csv(text: &str) -> ContactImportResult {
    parse_csv_excluding(text, &HashSet::new())
}

/// Parse comma-separated contact data, rejecting phones in `existing`
pub(crate) fn parse_csv_excluding(text: &str, existing: &HashSet<String>) -> ContactImportResult {
    let mut result = ContactImportResult::default();
    let mut lines = text.trim().split('\n');

    let headers: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();

    let Some(columns) = ColumnMap::detect(&headers) else {
        result.errors.push(ImportError::new(
            0,
            "telefone",
            "phone column not found (telefone, phone, numero)",
        ));
        return result;
    };

    let mut seen: HashSet<String> = existing.clone();

    for (index, line) in lines.enumerate() {
        // header is line 1, so the first data row is line 2
        let row = index + 2;
        let values: Vec<&str> = line.split(',').map(str::trim).collect();

        if values.len() != columns.width {
            result.errors.push(ImportError::new(
                row,
                "geral",
                "column count does not match the header",
            ));
            result.error_count += 1;
            continue;
        }

        let phone_number = normalize_phone(values[columns.phone]);
        if phone_number.len() < MIN_PHONE_DIGITS {
            result
                .errors
                .push(ImportError::new(row, "telefone", "invalid phone number"));
            result.error_count += 1;
            continue;
        }

        if !seen.insert(phone_number.clone()) {
            result
                .errors
                .push(ImportError::new(row, "telefone", "duplicate phone number"));
            result.error_count += 1;
            continue;
        }

        let custom_fields: CustomFields = headers
            .iter()
            .zip(&values)
            .enumerate()
            .filter(|(i, (_, value))| !columns.is_recognised(*i) && !value.is_empty())
            .map(|(_, (header, value))| (header.clone(), value.to_string()))
            .collect();

        result.preview.push(NewCampaignContact {
            phone_number,
            name: optional_cell(&values, columns.name),
            external_id: optional_cell(&values, columns.id),
            custom_fields,
        });
        result.success_count += 1;
    }

    debug!(
        success = result.success_count,
        errors = result.error_count,
        "Parsed contact CSV"
    );

    result
}

/// Manual entry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("phone number must have at least 10 digits")]
    InvalidPhone,

    #[error("phone number {0} has already been added")]
    Duplicate(String),

    #[error("no contact at position {0}")]
    IndexOutOfRange(usize),
}

impl From<ContactError> for Error {
    fn from(err: ContactError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Ordered working set of contacts with unique phone numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactSet {
    contacts: Vec<NewCampaignContact>,
}

impl ContactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single contact typed in by the user
    pub fn add_manual(
        &mut self,
        phone: &str,
        name: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<&NewCampaignContact, ContactError> {
        let phone_number = normalize_phone(phone);
        if phone_number.len() < MIN_PHONE_DIGITS {
            return Err(ContactError::InvalidPhone);
        }
        if self.contains(&phone_number) {
            return Err(ContactError::Duplicate(phone_number));
        }

        let trimmed = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        self.contacts.push(NewCampaignContact {
            phone_number,
            name: trimmed(name),
            external_id: trimmed(external_id),
            custom_fields: CustomFields::new(),
        });

        Ok(&self.contacts[self.contacts.len() - 1])
    }

    /// Import CSV text, appending every accepted row.
    ///
    /// Phones already in the set are reported as duplicate rows.
    pub fn import_csv(&mut self, text: &str) -> ContactImportResult {
        let existing: HashSet<String> = self.phones().map(str::to_string).collect();
        let result = parse_csv_excluding(text, &existing);

        self.contacts.extend(result.preview.iter().cloned());
        info!(
            imported = result.success_count,
            rejected = result.error_count,
            total = self.contacts.len(),
            "Imported contacts"
        );

        result
    }

    pub fn remove(&mut self, index: usize) -> Result<NewCampaignContact, ContactError> {
        if index >= self.contacts.len() {
            return Err(ContactError::IndexOutOfRange(index));
        }
        Ok(self.contacts.remove(index))
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contains(&self, phone_number: &str) -> bool {
        self.contacts.iter().any(|c| c.phone_number == phone_number)
    }

    pub fn phones(&self) -> impl Iterator<Item = &str> {
        self.contacts.iter().map(|c| c.phone_number.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NewCampaignContact> {
        self.contacts.iter()
    }

    pub fn as_slice(&self) -> &[NewCampaignContact] {
        &self.contacts
    }

    pub fn first(&self) -> Option<&NewCampaignContact> {
        self.contacts.first()
    }
}

impl From<Vec<NewCampaignContact>> for ContactSet {
    /// Later repeats of a phone number are dropped
    fn from(contacts: Vec<NewCampaignContact>) -> Self {
        let mut seen = HashSet::new();
        Self {
            contacts: contacts
                .into_iter()
                .filter(|c| seen.insert(c.phone_number.clone()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ContactSet {
    type Item = &'a NewCampaignContact;
    type IntoIter = std::slice::Iter<'a, NewCampaignContact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(55) 11 91234-5678"), "5511912345678");
        assert_eq!(normalize_phone("5511912345678"), "5511912345678");
        assert_eq!(normalize_phone("+55 (11) abc"), "5511");
    }

    #[test]
    fn test_well_formed_rows() {
        let csv = "ID,Telefone,Nome\n1,5511900000001,Ana\n2,5511900000002,Bruno\n3,5511900000003,Carla";
        let result = parse_csv(csv);

        assert_eq!(result.success_count, 3);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.preview.len(), 3);
        assert!(result.errors.is_empty());

        let first = &result.preview[0];
        assert_eq!(first.phone_number, "5511900000001");
        assert_eq!(first.name.as_deref(), Some("Ana"));
        assert_eq!(first.external_id.as_deref(), Some("1"));
        assert!(first.custom_fields.is_empty());
    }

    #[test]
    fn test_missing_phone_column_is_fatal() {
        let result = parse_csv("ID,Nome,Cidade\n1,Ana,SP\n2,Bruno,RJ");

        assert_eq!(result.success_count, 0);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 0);
        assert_eq!(result.errors[0].field, "telefone");
        assert!(result.is_fatal());
    }

    #[test]
    fn test_bad_row_is_isolated() {
        let csv = "ID,Telefone,Nome\n\
                   1,5511900000001,Ana\n\
                   2,5511900000002,Bruno\n\
                   3,12345,Carla\n\
                   4,5511900000004,Davi\n\
                   5,5511900000005,Eva";
        let result = parse_csv(csv);

        assert_eq!(result.success_count, 4);
        assert_eq!(result.error_count, 1);
        assert_eq!(
            result.errors,
            vec![ImportError::new(4, "telefone", "invalid phone number")]
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let result = parse_csv("Telefone,Nome\n5511900000001,Ana,extra\n5511900000002,Bruno");

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].row, 2);
        assert_eq!(result.errors[0].field, "geral");
    }

    #[test]
    fn test_custom_fields_and_header_synonyms() {
        let csv = "Phone Number,Full Name,Estado,Empresa\r\n(11) 91234-5678 ,Ana, SP ,\r\n";
        let result = parse_csv(csv);

        assert_eq!(result.success_count, 1);
        let contact = &result.preview[0];
        assert_eq!(contact.phone_number, "11912345678");
        assert_eq!(contact.name.as_deref(), Some("Ana"));
        assert_eq!(contact.external_id, None);
        assert_eq!(
            contact.custom_fields,
            CustomFields::from([("estado".to_string(), "SP".to_string())])
        );
    }

    #[test]
    fn test_duplicates_within_file() {
        let result = parse_csv("telefone\n5511900000001\n(55) 11 90000-0001\n5511900000002");

        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(result.errors[0].message, "duplicate phone number");
    }

    #[test]
    fn test_template_parses_cleanly() {
        let result = parse_csv(CSV_TEMPLATE);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.preview[1].custom_fields["empresa"], "Empresa XYZ");
        assert_eq!(result.preview[0].name.as_deref(), Some("João Silva"));
    }

    #[test]
    fn test_manual_entry() {
        let mut set = ContactSet::new();

        let added = set
            .add_manual("(55) 11 91234-5678", Some("  Ana "), Some(""))
            .unwrap();
        assert_eq!(added.phone_number, "5511912345678");
        assert_eq!(added.name.as_deref(), Some("Ana"));
        assert_eq!(added.external_id, None);

        assert_eq!(
            set.add_manual("5511912345678", None, None).unwrap_err(),
            ContactError::Duplicate("5511912345678".to_string())
        );
        assert_eq!(
            set.add_manual("12345", None, None).unwrap_err(),
            ContactError::InvalidPhone
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_import_rejects_phones_already_in_set() {
        let mut set = ContactSet::new();
        set.add_manual("5511900000001", Some("Ana"), None).unwrap();

        let result = set.import_csv("telefone,nome\n5511900000001,Ana\n5511900000002,Bruno");

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].message, "duplicate phone number");
        assert_eq!(
            set.phones().collect::<Vec<_>>(),
            vec!["5511900000001", "5511900000002"]
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut set = ContactSet::new();
        set.add_manual("5511900000001", None, None).unwrap();
        set.add_manual("5511900000002", None, None).unwrap();

        let removed = set.remove(0).unwrap();
        assert_eq!(removed.phone_number, "5511900000001");
        assert_eq!(set.remove(5).unwrap_err(), ContactError::IndexOutOfRange(5));

        set.clear();
        assert!(set.is_empty());
    }
}
