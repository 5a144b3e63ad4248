//! HTTP client for the annotation service REST API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::app::service::AnnotationService;
use crate::domain::errors::ServiceError;
use crate::domain::model::{AnnotationRecord, FileRecord};
use crate::infra::config::Service as ServiceConfig;

#[derive(Debug, Deserialize)]
struct FileInfo {
    uuid: String,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<FileInfo> for FileRecord {
    fn from(info: FileInfo) -> Self {
        FileRecord {
            name: info
                .item_name
                .clone()
                .or_else(|| info.file_name.clone())
                .unwrap_or_else(|| info.uuid.clone()),
            id: info.uuid,
            file_name: info.file_name,
            created_at: info.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileInfoList {
    #[serde(default)]
    info: Vec<FileInfo>,
}

#[derive(Debug, Deserialize)]
struct AnnotationInfo {
    #[serde(default)]
    function_name: Option<String>,
    #[serde(default)]
    annotation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotationList {
    #[serde(default)]
    info: Vec<AnnotationInfo>,
}

impl AnnotationList {
    /// Records with both a name and a text; incomplete rows are skipped.
    fn into_records(self) -> Vec<AnnotationRecord> {
        self.info
            .into_iter()
            .filter_map(|info| {
                let name = info.function_name.filter(|name| !name.is_empty())?;
                let text = info.annotation.filter(|text| !text.is_empty())?;
                Some(AnnotationRecord { name, text })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedAnnotation {
    annotation: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`AnnotationService`] backed by the REST API under `base_url`.
#[derive(Debug, Clone)]
pub struct HttpAnnotationService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAnnotationService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config
                .token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport_error)?;
        decode(&body)
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotationService {
    async fn upload_file(&self, name: &str, content: &str) -> Result<FileRecord, ServiceError> {
        let part = Part::bytes(content.as_bytes().to_vec())
            .file_name(upload_file_name(name))
            .mime_str("text/plain")
            .map_err(transport_error)?;
        let form = Form::new().text("name", name.to_string()).part("file", part);
        let info: FileInfo = self
            .send_json(self.client.post(self.url("file/upload")).multipart(form))
            .await?;
        tracing::info!(file_id = %info.uuid, name, "file uploaded");
        Ok(info.into())
    }

    async fn list_annotations(&self, file_id: &str) -> Result<Vec<AnnotationRecord>, ServiceError> {
        let request = self
            .client
            .get(self.url("annotation/generate"))
            .query(&[("file_uuid", file_id)]);
        let list: AnnotationList = self.send_json(request).await?;
        Ok(list.into_records())
    }

    async fn generate_annotation(&self, file_id: &str, span_text: &str) -> Result<String, ServiceError> {
        let request = self
            .client
            .post(self.url("annotation/generate"))
            .form(&[("file_uuid", file_id), ("code", span_text)]);
        let generated: GeneratedAnnotation = self.send_json(request).await?;
        Ok(generated.annotation)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        self.send(self.client.delete(self.url(&format!("file/{file_id}"))))
            .await?;
        tracing::info!(file_id, "file deleted");
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, ServiceError> {
        let list: FileInfoList = self.send_json(self.client.get(self.url("file/upload"))).await?;
        Ok(list.info.into_iter().map(FileRecord::from).collect())
    }
}

/// Map a non-success response onto the service error taxonomy.
pub fn error_for_status(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };

    match status {
        StatusCode::BAD_REQUEST => ServiceError::Validation(message),
        StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message),
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        other => ServiceError::Status {
            status: other.as_u16(),
            message,
        },
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|err| ServiceError::Decode(err.to_string()))
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Transport(format!("request timed out: {err}"))
    } else {
        ServiceError::Transport(err.to_string())
    }
}

fn upload_file_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_error_kinds() {
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, r#"{"message": "name is required"}"#),
            ServiceError::Validation("name is required".into())
        );
        assert_eq!(
            error_for_status(StatusCode::UNAUTHORIZED, "token expired"),
            ServiceError::Unauthorized("token expired".into())
        );
        assert_eq!(
            error_for_status(StatusCode::NOT_FOUND, ""),
            ServiceError::NotFound("Not Found".into())
        );
        assert_eq!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ServiceError::Status {
                status: 500,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn decodes_file_records() {
        let list: FileInfoList = decode(
            r#"{"info": [{"uuid": "u1", "item_name": "demo", "file_name": "demo.py",
                "created_at": "2024-05-01T10:00:00Z", "owner_id": "o1", "parsed_map": "{}"}]}"#,
        )
        .unwrap();
        let records: Vec<FileRecord> = list.info.into_iter().map(FileRecord::from).collect();
        assert_eq!(records[0].id, "u1");
        assert_eq!(records[0].name, "demo");
        assert_eq!(records[0].file_name.as_deref(), Some("demo.py"));
        assert!(records[0].created_at_utc().is_some());
    }

    #[test]
    fn missing_item_name_falls_back() {
        let info: FileInfo = decode(r#"{"uuid": "u2", "file_name": "x.js"}"#).unwrap();
        assert_eq!(FileRecord::from(info).name, "x.js");
    }

    #[test]
    fn decodes_annotation_lists() {
        let list: AnnotationList = decode(
            r#"{"info": [{"function_name": "main", "annotation": "Entry point."}]}"#,
        )
        .unwrap();
        let records = list.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "main");
        assert_eq!(records[0].text, "Entry point.");

        let empty: AnnotationList = decode("{}").unwrap();
        assert!(empty.info.is_empty());
        assert!(matches!(
            decode::<GeneratedAnnotation>("not json"),
            Err(ServiceError::Decode(_))
        ));
    }

    #[test]
    fn incomplete_annotation_rows_are_skipped() {
        let list: AnnotationList = decode(
            r#"{"info": [
                {"function_name": null, "annotation": "orphan"},
                {"function_name": "run", "annotation": null},
                {"function_name": "", "annotation": "blank name"},
                {"annotation": "no name"},
                {"function_name": "main", "annotation": "Entry point."}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = list
            .into_records()
            .into_iter()
            .map(|record| record.name)
            .collect();
        assert_eq!(names, vec!["main"]);
    }

    #[test]
    fn builds_urls_and_skips_blank_tokens() {
        let config = ServiceConfig {
            base_url: "http://localhost:5000/api/v1/".into(),
            timeout_secs: 5,
            token: Some("  ".into()),
        };
        let service = HttpAnnotationService::new(&config).unwrap();
        assert_eq!(service.url("/file/upload"), "http://localhost:5000/api/v1/file/upload");
        assert!(service.token.is_none());
    }

    #[test]
    fn upload_names_get_an_extension() {
        assert_eq!(upload_file_name("demo"), "demo.txt");
        assert_eq!(upload_file_name("app.py"), "app.py");
    }
}
