use std::path::{Path, PathBuf};

use tracing::info;

use leavedesk_core::domain::import::check_upload;
use leavedesk_core::errors::ValidationError;

use crate::error::ApiError;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// A workbook that passed the local checks and is ready for upload.
#[derive(Clone, Debug)]
pub struct ImportUpload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImportUpload {
    /// Validates the selection (exactly one Excel file within the size cap)
    /// and reads it. Nothing is sent on failure.
    pub async fn from_paths(paths: &[PathBuf]) -> Result<Self, ApiError> {
        let mut selection = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata =
                tokio::fs::metadata(path).await.map_err(|error| unreadable(path, &error))?;
            selection.push((path.as_path(), metadata.len()));
        }
        check_upload(&selection)?;

        let [path] = paths else {
            return Err(ValidationError::FileCount { expected: 1, actual: paths.len() }.into());
        };
        let bytes = tokio::fs::read(path).await.map_err(|error| unreadable(path, &error))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(
            event_name = "import.upload.prepared",
            file_name = %file_name,
            size = bytes.len(),
            "workbook ready for upload"
        );
        Ok(Self { content_type: content_type_for(path), file_name, bytes })
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let is_legacy = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xls"));
    if is_legacy {
        XLS_CONTENT_TYPE
    } else {
        XLSX_CONTENT_TYPE
    }
}

fn unreadable(path: &Path, error: &std::io::Error) -> ApiError {
    ApiError::Validation(ValidationError::UnreadableFile {
        file_name: path.display().to_string(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use leavedesk_core::errors::ValidationError;

    use super::{ImportUpload, XLS_CONTENT_TYPE, XLSX_CONTENT_TYPE};
    use crate::error::ApiError;

    #[tokio::test]
    async fn single_workbook_is_read_with_its_content_type() {
        let dir = TempDir::new().expect("temp dir");
        let xlsx = dir.path().join("staff.xlsx");
        let xls = dir.path().join("legacy.XLS");
        std::fs::write(&xlsx, b"PK\x03\x04workbook").expect("write xlsx");
        std::fs::write(&xls, b"\xd0\xcf\x11\xe0").expect("write xls");

        let upload = ImportUpload::from_paths(&[xlsx]).await.expect("xlsx accepted");
        assert_eq!(upload.file_name, "staff.xlsx");
        assert_eq!(upload.content_type, XLSX_CONTENT_TYPE);
        assert_eq!(upload.bytes.len(), 12);

        let legacy = ImportUpload::from_paths(&[xls]).await.expect("xls accepted");
        assert_eq!(legacy.content_type, XLS_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn wrong_selection_is_rejected_locally() {
        let dir = TempDir::new().expect("temp dir");
        let csv = dir.path().join("staff.csv");
        std::fs::write(&csv, b"a,b").expect("write csv");

        let error = ImportUpload::from_paths(&[]).await.expect_err("no file");
        assert!(matches!(
            error,
            ApiError::Validation(ValidationError::FileCount { expected: 1, actual: 0 })
        ));

        let error = ImportUpload::from_paths(&[csv]).await.expect_err("csv");
        assert!(matches!(error, ApiError::Validation(ValidationError::FileType { .. })));

        let missing = PathBuf::from("/definitely/not/here.xlsx");
        let error = ImportUpload::from_paths(&[missing]).await.expect_err("missing");
        assert!(matches!(error, ApiError::Validation(ValidationError::UnreadableFile { .. })));
    }
}
