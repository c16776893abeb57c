//! Remote folder store backed by the Google Drive v3 REST API
//!
//! Authentication is out of scope here: the caller supplies a ready bearer
//! token. Every request carries the configured timeout, so a stalled
//! download fails that one file instead of hanging the run.

use super::{is_spreadsheet_name, FileHandle, FileOrder, FileSource, Locator};
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const MULTIPART_BOUNDARY: &str = "ingest-upload-boundary-7f3a9c";
const PAGE_SIZE: u32 = 1000;

/// Connection settings for one remote folder.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub folder_id: String,
    pub access_token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl DriveConfig {
    pub fn new(folder_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// File resource as returned by `files.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    modified_time: Option<DateTime<Utc>>,
    // int64 fields arrive as JSON strings
    #[serde(default)]
    size: Option<String>,
}

impl From<DriveFile> for FileHandle {
    fn from(file: DriveFile) -> Self {
        FileHandle {
            name: file.name,
            locator: Locator::Remote(file.id),
            modified_time: file.modified_time,
            size: file.size.and_then(|s| s.parse().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// One folder of the remote store.
pub struct DriveFolder {
    client: Client,
    config: DriveConfig,
    order: FileOrder,
}

impl DriveFolder {
    pub fn new(config: DriveConfig) -> Result<Self, SourceError> {
        if config.folder_id.trim().is_empty() {
            return Err(SourceError::Config("remote folder id is not set".into()));
        }
        if config.access_token.trim().is_empty() {
            return Err(SourceError::Config("remote access token is not set".into()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            order: FileOrder::ModifiedDesc,
        })
    }

    pub fn with_order(mut self, order: FileOrder) -> Self {
        self.order = order;
        self
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.config.api_base.trim_end_matches('/'))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id,name",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Upload a spreadsheet into the folder, returning the new file id.
    pub fn try_upload(&self, bytes: &[u8], name: &str) -> Result<String, SourceError> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.config.folder_id],
        });
        let body = multipart_related_body(&metadata, mime_for_name(name), bytes);

        let resp = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.config.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()?;
        let created: CreatedFile = serde_json::from_str(&checked(resp)?.text()?)?;

        info!(file = %name, id = %created.id, "uploaded file to remote folder");
        Ok(created.id)
    }

    /// Upload, logging failures. `None` means nothing was stored.
    pub fn upload(&self, bytes: &[u8], name: &str) -> Option<String> {
        match self.try_upload(bytes, name) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(file = %name, error = %e, "upload to remote folder failed");
                None
            }
        }
    }

    pub fn try_delete(&self, id: &str) -> Result<(), SourceError> {
        let resp = self
            .client
            .delete(format!("{}/{}", self.files_url(), id))
            .bearer_auth(&self.config.access_token)
            .send()?;
        checked(resp)?;
        info!(id = %id, "deleted file from remote folder");
        Ok(())
    }

    /// Delete, logging failures. Returns whether the file is gone.
    pub fn delete(&self, id: &str) -> bool {
        match self.try_delete(id) {
            Ok(()) => true,
            Err(e) => {
                error!(id = %id, error = %e, "delete from remote folder failed");
                false
            }
        }
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<FileHandle>, SourceError> {
        Ok(self.list_files()?.into_iter().find(|f| f.name == name))
    }
}

impl FileSource for DriveFolder {
    fn describe(&self) -> String {
        format!("remote:{}", self.config.folder_id)
    }

    fn order(&self) -> FileOrder {
        self.order
    }

    fn list_files(&self) -> Result<Vec<FileHandle>, SourceError> {
        let query = list_query(&self.config.folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.files_url())
                .bearer_auth(&self.config.access_token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken, files(id, name, modifiedTime, size)"),
                    ("orderBy", "modifiedTime desc"),
                ])
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = serde_json::from_str(&checked(request.send()?)?.text()?)?;
            page_token = merge_page(&mut files, page);
            if page_token.is_none() {
                break;
            }
        }

        info!(folder = %self.config.folder_id, count = files.len(), "listed remote folder");
        self.order.sort(&mut files);
        Ok(files)
    }

    fn read(&self, handle: &FileHandle) -> Result<Vec<u8>, SourceError> {
        let id = match &handle.locator {
            Locator::Remote(id) => id,
            Locator::Path(path) => {
                return Err(SourceError::Config(format!(
                    "{} is a local path, not a remote file",
                    path.display()
                )))
            }
        };

        let resp = self
            .client
            .get(format!("{}/{}", self.files_url(), id))
            .bearer_auth(&self.config.access_token)
            .query(&[("alt", "media")])
            .send()?;
        Ok(checked(resp)?.bytes()?.to_vec())
    }
}

/// Append a page's spreadsheets and return the token of the next page, if
/// there is one.
fn merge_page(files: &mut Vec<FileHandle>, page: FileList) -> Option<String> {
    files.extend(
        page.files
            .into_iter()
            .filter(|f| is_spreadsheet_name(&f.name))
            .map(FileHandle::from),
    );
    page.next_page_token.filter(|token| !token.is_empty())
}

/// Server-side filter: spreadsheets directly inside the folder, not trashed.
fn list_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and (mimeType='{}' or mimeType='{}') and trashed=false",
        folder_id.replace('\'', "\\'"),
        XLSX_MIME,
        XLS_MIME
    )
}

fn mime_for_name(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".xls") {
        XLS_MIME
    } else {
        XLSX_MIME
    }
}

fn multipart_related_body(metadata: &serde_json::Value, mime: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            meta = metadata,
            mime = mime
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

fn checked(resp: Response) -> Result<Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_restricts_folder_and_mime() {
        let q = list_query("abc123");
        assert!(q.starts_with("'abc123' in parents"));
        assert!(q.contains(XLSX_MIME));
        assert!(q.contains(XLS_MIME));
        assert!(q.ends_with("trashed=false"));
    }

    #[test]
    fn test_pages_merge_in_order_until_no_token() {
        let first: FileList = serde_json::from_str(
            r#"{"nextPageToken": "p2", "files": [
                {"id": "1", "name": "b_20240102.xlsx"},
                {"id": "2", "name": "notes.txt"}
            ]}"#,
        )
        .unwrap();
        let last: FileList = serde_json::from_str(
            r#"{"nextPageToken": "", "files": [{"id": "3", "name": "a_20240101.xls"}]}"#,
        )
        .unwrap();

        let mut files = Vec::new();
        assert_eq!(merge_page(&mut files, first), Some("p2".to_string()));
        assert_eq!(merge_page(&mut files, last), None);

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b_20240102.xlsx", "a_20240101.xls"]);
        assert_eq!(files[1].locator, Locator::Remote("3".into()));
    }

    #[test]
    fn test_missing_token_ends_listing() {
        let page: FileList = serde_json::from_str(r#"{"files": []}"#).unwrap();
        let mut files = Vec::new();
        assert_eq!(merge_page(&mut files, page), None);
        assert!(files.is_empty());
    }

    #[test]
    fn test_list_query_escapes_quotes() {
        assert!(list_query("o'brien").starts_with("'o\\'brien' in parents"));
    }

    #[test]
    fn test_file_list_decodes_into_handles() {
        let json = r#"{
            "nextPageToken": "tok",
            "files": [
                {"id": "1", "name": "report_20240115.xlsx", "modifiedTime": "2024-01-15T08:30:00.000Z", "size": "2048"},
                {"id": "2", "name": "legacy.xls"}
            ]
        }"#;
        let list: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("tok"));

        let handles: Vec<FileHandle> = list.files.into_iter().map(FileHandle::from).collect();
        assert_eq!(handles[0].locator, Locator::Remote("1".into()));
        assert_eq!(handles[0].size, Some(2048));
        assert_eq!(
            handles[0].modified_time.map(|t| t.to_rfc3339()),
            Some("2024-01-15T08:30:00+00:00".to_string())
        );
        assert_eq!(handles[1].modified_time, None);
        assert_eq!(handles[1].size, None);
    }

    #[test]
    fn test_empty_file_list_decodes() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("a.xlsx"), XLSX_MIME);
        assert_eq!(mime_for_name("A.XLS"), XLS_MIME);
    }

    #[test]
    fn test_multipart_body_layout() {
        let meta = serde_json::json!({"name": "a.xlsx"});
        let body = multipart_related_body(&meta, XLSX_MIME, b"PK\x03\x04");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", MULTIPART_BOUNDARY)));
        assert!(text.contains(r#"{"name":"a.xlsx"}"#));
        assert!(text.contains(&format!("Content-Type: {}\r\n\r\nPK", XLSX_MIME)));
        assert!(text.ends_with(&format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY)));
    }

    #[test]
    fn test_new_requires_folder_and_token() {
        assert!(matches!(
            DriveFolder::new(DriveConfig::new("", "token")),
            Err(SourceError::Config(_))
        ));
        assert!(matches!(
            DriveFolder::new(DriveConfig::new("folder", " ")),
            Err(SourceError::Config(_))
        ));
    }

    #[test]
    fn test_local_locator_rejected_on_read() {
        let folder = DriveFolder::new(DriveConfig::new("folder", "token")).unwrap();
        let handle = FileHandle {
            name: "a.xlsx".into(),
            locator: Locator::Path("a.xlsx".into()),
            modified_time: None,
            size: None,
        };
        assert!(matches!(folder.read(&handle), Err(SourceError::Config(_))));
    }
}
