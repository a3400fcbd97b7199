use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogPage {
    pub data: Vec<AuditLogEntry>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl AuditLogPage {
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page)) as u32
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self { page: 1, per_page: 10, action: None }
    }
}

const CSV_HEADER: [&str; 6] = ["id", "created_at", "actor", "action", "target", "details"];

/// Renders entries as RFC 4180 CSV, timestamps shown in `offset`.
pub fn export_csv(entries: &[AuditLogEntry], offset: FixedOffset) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER.iter().map(|field| field.to_string()));

    for entry in entries {
        push_record(
            &mut out,
            [
                entry.id.to_string(),
                entry.created_at.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.actor.clone(),
                entry.action.clone(),
                entry.target.clone().unwrap_or_default(),
                entry.details.clone().unwrap_or_default(),
            ]
            .into_iter(),
        );
    }

    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields.map(|field| escape_field(&field)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
