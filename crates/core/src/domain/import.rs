//! Bulk user import: the upload checks done before sending a workbook and
//! the report the backend returns afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

pub const MAX_IMPORT_FILE_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_number: Option<u32>,
    pub reason: String,
}

impl FailedUser {
    /// Email when present, otherwise the spreadsheet row.
    pub fn label(&self) -> String {
        match (&self.email, self.row_number) {
            (Some(email), _) => email.clone(),
            (None, Some(row)) => format!("row {row}"),
            (None, None) => "-".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportReport {
    pub created_count: u32,
    pub failed_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_users: Option<Vec<CreatedUser>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_users: Option<Vec<FailedUser>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureRow {
    pub label: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created_count: u32,
    pub failed_count: u32,
    pub created: Vec<String>,
    pub failures: Vec<FailureRow>,
}

impl BulkImportReport {
    pub fn failure_rows(&self) -> Vec<FailureRow> {
        self.failed_users
            .iter()
            .flatten()
            .map(|user| FailureRow { label: user.label(), reason: user.reason.clone() })
            .collect()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created_users
            .iter()
            .flatten()
            .map(|user| {
                let prefix = user.prefix_name.as_deref().unwrap_or("");
                format!("{prefix}{} {} <{}>", user.first_name, user.last_name, user.email)
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            created_count: self.created_count,
            failed_count: self.failed_count,
            created: self.created_names(),
            failures: self.failure_rows(),
        }
    }
}

/// Checks run on the selected files before anything is uploaded.
pub fn check_upload(files: &[(&Path, u64)]) -> Result<(), ValidationError> {
    let [(path, size)] = files else {
        return Err(ValidationError::FileCount { expected: 1, actual: files.len() });
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::FileType { file_name: path.display().to_string() });
    }

    if *size == 0 || *size > MAX_IMPORT_FILE_BYTES {
        return Err(ValidationError::FileSize { size: *size, max: MAX_IMPORT_FILE_BYTES });
    }

    Ok(())
}
