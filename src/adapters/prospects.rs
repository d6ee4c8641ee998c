//! Prospect import from CSV exports and JSON files.

use crate::core::preflight::{normalize_email, normalize_linkedin_url};
use crate::domain::model::{ApprovalStatus, DegreeValue, Prospect};
use crate::domain::ports::{ProspectSource, Storage};
use crate::utils::error::{OutreachError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Id,
    Name,
    FirstName,
    LastName,
    Email,
    LinkedinUrl,
    ApprovalStatus,
    ConnectionDegree,
    Degree,
    ConnectionLabel,
    ConnectionDegreeLabel,
    ProviderDegree,
}

/// Header aliases after lowercasing and mapping spaces/dashes to `_`.
const COLUMN_ALIASES: &[(Column, &[&str])] = &[
    (Column::Id, &["id", "prospect_id", "prospectid"]),
    (Column::Name, &["name", "full_name", "fullname"]),
    (Column::FirstName, &["first_name", "firstname"]),
    (Column::LastName, &["last_name", "lastname"]),
    (Column::Email, &["email", "email_address", "emailaddress", "e_mail"]),
    (
        Column::LinkedinUrl,
        &[
            "linkedin_url",
            "linkedinurl",
            "linkedin",
            "linkedin_profile_url",
            "linkedinprofileurl",
            "profile_url",
        ],
    ),
    (Column::ApprovalStatus, &["approval_status", "approvalstatus"]),
    (
        Column::ConnectionDegree,
        &["connection_degree", "connectiondegree"],
    ),
    (Column::Degree, &["degree"]),
    (Column::ConnectionLabel, &["connection"]),
    (Column::ProviderDegree, &["linkedin_connection_degree"]),
];

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Spreadsheet exports label the degree column "Connection Degree"; it feeds the
/// label alias, not the structured `connection_degree` field.
const DEGREE_LABEL_HEADER: &str = "connection degree";

fn column_for(header: &str) -> Option<Column> {
    if header.trim().eq_ignore_ascii_case(DEGREE_LABEL_HEADER) {
        return Some(Column::ConnectionDegreeLabel);
    }
    let key = normalize_header(header);
    COLUMN_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(column, _)| *column)
}

fn prospect_from_row(
    row_number: usize,
    row: &HashMap<Column, String>,
    assume_approved: bool,
) -> Prospect {
    let value = |column: Column| {
        row.get(&column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let email = value(Column::Email);
    let linkedin_url = value(Column::LinkedinUrl);

    // Stable identity: explicit id, then LinkedIn slug, then e-mail.
    let id = value(Column::Id)
        .or_else(|| linkedin_url.as_deref().and_then(normalize_linkedin_url))
        .or_else(|| email.as_deref().and_then(normalize_email))
        .unwrap_or_else(|| format!("row-{}", row_number));

    let name = value(Column::Name).or_else(|| {
        let parts: Vec<String> = [value(Column::FirstName), value(Column::LastName)]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    });

    let approval_status = match value(Column::ApprovalStatus) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Row {}: {}, treating as pending", row_number, e);
            ApprovalStatus::Pending
        }),
        None if assume_approved => ApprovalStatus::Approved,
        None => ApprovalStatus::Pending,
    };

    Prospect {
        id,
        name,
        email,
        linkedin_url,
        approval_status,
        connection_degree: value(Column::ConnectionDegree),
        degree: value(Column::Degree).map(DegreeValue::Text),
        connection_label: value(Column::ConnectionLabel),
        connection_degree_label: value(Column::ConnectionDegreeLabel),
        linkedin_connection_degree: value(Column::ProviderDegree),
        contact: None,
    }
}

pub fn parse_csv(data: &[u8], assume_approved: bool) -> Result<Vec<Prospect>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let columns: Vec<Option<Column>> = reader.headers()?.iter().map(column_for).collect();
    if !columns.iter().any(|c| matches!(c, Some(Column::LinkedinUrl) | Some(Column::Email))) {
        tracing::warn!("⚠️ Prospect file has neither a LinkedIn URL nor an e-mail column");
    }

    let mut prospects = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = HashMap::new();
        for (column, field) in columns.iter().zip(record.iter()) {
            // First non-blank column wins when a file repeats an alias.
            if let (Some(column), false) = (column, field.is_empty()) {
                row.entry(*column).or_insert_with(|| field.to_string());
            }
        }
        if row.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        prospects.push(prospect_from_row(index + 1, &row, assume_approved));
    }

    Ok(prospects)
}

pub fn parse_json(data: &[u8]) -> Result<Vec<Prospect>> {
    Ok(serde_json::from_slice(data)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProspectFormat {
    Csv,
    Json,
}

impl ProspectFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(OutreachError::InvalidConfigValueError {
                field: "prospects".to_string(),
                value: path.to_string(),
                reason: "Prospect files must be .csv or .json".to_string(),
            }),
        }
    }
}

pub struct FileProspectSource<S: Storage> {
    storage: S,
    path: String,
    format: ProspectFormat,
    assume_approved: bool,
}

impl<S: Storage> FileProspectSource<S> {
    pub fn new(storage: S, path: impl Into<String>, assume_approved: bool) -> Result<Self> {
        let path = path.into();
        let format = ProspectFormat::from_path(&path)?;
        Ok(Self {
            storage,
            path,
            format,
            assume_approved,
        })
    }
}

#[async_trait]
impl<S: Storage> ProspectSource for FileProspectSource<S> {
    async fn load_prospects(&self) -> Result<Vec<Prospect>> {
        let data = self.storage.read_file(&self.path).await?;
        let prospects = match self.format {
            ProspectFormat::Csv => parse_csv(&data, self.assume_approved)?,
            ProspectFormat::Json => parse_json(&data)?,
        };
        tracing::info!("📥 Loaded {} prospects from {}", prospects.len(), self.path);
        Ok(prospects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::eligibility::{classify, resolve_degree_signal, ConnectionDegreeBucket};

    #[test]
    fn test_csv_column_aliases() {
        let csv = "First Name,Last Name,LinkedIn URL,Email Address,Connection\n\
                   Jane,Doe,https://www.linkedin.com/in/Jane-Doe/,jane@acme.io,1st\n\
                   Raj,,https://linkedin.com/in/raj,,3rd\n";
        let prospects = parse_csv(csv.as_bytes(), true).unwrap();

        assert_eq!(prospects.len(), 2);
        assert_eq!(prospects[0].id, "jane-doe");
        assert_eq!(prospects[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(prospects[0].email(), Some("jane@acme.io"));
        assert!(prospects[0].is_approved());
        assert_eq!(classify(&prospects[0]).bucket, ConnectionDegreeBucket::First);
        assert_eq!(prospects[1].email(), None);
        assert_eq!(classify(&prospects[1]).bucket, ConnectionDegreeBucket::SecondOrThird);
    }

    #[test]
    fn test_csv_approval_column_and_default() {
        let csv = "id,email,approval_status\n\
                   a,a@x.io,approved\n\
                   b,b@x.io,rejected\n\
                   c,c@x.io,\n\
                   d,d@x.io,maybe\n";
        let assumed = parse_csv(csv.as_bytes(), true).unwrap();
        let statuses: Vec<_> = assumed.iter().map(|p| p.approval_status).collect();
        assert_eq!(
            statuses,
            vec![
                ApprovalStatus::Approved,
                ApprovalStatus::Rejected,
                ApprovalStatus::Approved,
                ApprovalStatus::Pending
            ]
        );

        let strict = parse_csv(csv.as_bytes(), false).unwrap();
        assert_eq!(strict[2].approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_blank_rows_are_skipped_and_ids_fall_back() {
        let csv = "name,degree\n,\nNo Handle,2\n";
        let prospects = parse_csv(csv.as_bytes(), true).unwrap();
        assert_eq!(prospects.len(), 1);
        assert_eq!(prospects[0].id, "row-2");
        assert_eq!(prospects[0].degree, Some(DegreeValue::Text("2".to_string())));
    }

    #[test]
    fn test_repeated_alias_skips_blank_cells() {
        let csv = "id,email,Email Address,linkedin
                   a,,a@x.io,
                   b,b@x.io,other@x.io,
";
        let prospects = parse_csv(csv.as_bytes(), true).unwrap();
        assert_eq!(prospects[0].email(), Some("a@x.io"));
        assert_eq!(prospects[1].email(), Some("b@x.io"));
    }

    #[test]
    fn test_spaced_degree_header_feeds_label_alias() {
        let csv = "id,linkedin_url,connection_degree,Connection Degree
                   a,https://linkedin.com/in/a,,1st
                   b,https://linkedin.com/in/b,2nd,1st
";
        let prospects = parse_csv(csv.as_bytes(), true).unwrap();

        assert_eq!(prospects[0].connection_degree, None);
        assert_eq!(prospects[0].connection_degree_label.as_deref(), Some("1st"));
        assert_eq!(
            resolve_degree_signal(&prospects[0]),
            Some(("Connection Degree", "1st".to_string()))
        );
        // The structured field outranks the label.
        assert_eq!(classify(&prospects[1]).bucket, ConnectionDegreeBucket::SecondOrThird);
    }

    #[test]
    fn test_json_prospects() {
        let json = r#"[{"id": "p1", "linkedinUrl": "https://linkedin.com/in/p1", "approvalStatus": "approved", "connectionDegree": "2nd"}]"#;
        let prospects = parse_json(json.as_bytes()).unwrap();
        assert_eq!(prospects[0].connection_degree.as_deref(), Some("2nd"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ProspectFormat::from_path("leads.CSV").unwrap(), ProspectFormat::Csv);
        assert_eq!(ProspectFormat::from_path("dir/leads.json").unwrap(), ProspectFormat::Json);
        assert!(ProspectFormat::from_path("leads.xlsx").is_err());
    }
}
