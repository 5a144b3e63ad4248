//! Port to the remote file and annotation service.

use async_trait::async_trait;

use crate::domain::errors::ServiceError;
use crate::domain::model::{AnnotationRecord, FileRecord};

/// Remote storage for uploaded sources and generator of per-definition annotations.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Store a source file and return its record. Rejected uploads are
    /// [`ServiceError::Validation`].
    async fn upload_file(&self, name: &str, content: &str) -> Result<FileRecord, ServiceError>;

    /// Every annotation already generated for a file; empty when there are none.
    async fn list_annotations(&self, file_id: &str) -> Result<Vec<AnnotationRecord>, ServiceError>;

    /// Generate an annotation for one definition's text.
    async fn generate_annotation(&self, file_id: &str, span_text: &str) -> Result<String, ServiceError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError>;

    async fn list_files(&self) -> Result<Vec<FileRecord>, ServiceError>;
}

#[cfg(test)]
pub mod fake {
    //! In-memory service used by coordinator and session tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;

    #[derive(Default)]
    pub struct FakeService {
        pub listed: Mutex<HashMap<String, Vec<AnnotationRecord>>>,
        pub generated: Mutex<HashMap<String, String>>,
        pub fail_generate: Mutex<Option<ServiceError>>,
        pub list_calls: AtomicUsize,
        pub generate_calls: AtomicUsize,
        pub uploads: AtomicUsize,
        /// When set, `generate_annotation` waits for a notification before answering.
        pub gate: Mutex<Option<std::sync::Arc<Notify>>>,
    }

    impl FakeService {
        pub fn with_listed(file_id: &str, records: &[(&str, &str)]) -> Self {
            let service = Self::default();
            service.listed.lock().insert(
                file_id.to_string(),
                records
                    .iter()
                    .map(|(name, text)| AnnotationRecord {
                        name: name.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
            );
            service
        }

        pub fn generate_calls(&self) -> usize {
            self.generate_calls.load(Ordering::SeqCst)
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnnotationService for FakeService {
        async fn upload_file(&self, name: &str, content: &str) -> Result<FileRecord, ServiceError> {
            if content.is_empty() {
                return Err(ServiceError::Validation("empty file".into()));
            }
            let index = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(FileRecord {
                id: format!("file-{index}"),
                name: name.to_string(),
                file_name: Some(format!("{name}.txt")),
                created_at: None,
            })
        }

        async fn list_annotations(&self, file_id: &str) -> Result<Vec<AnnotationRecord>, ServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.listed.lock().get(file_id).cloned().unwrap_or_default())
        }

        async fn generate_annotation(&self, file_id: &str, span_text: &str) -> Result<String, ServiceError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Some(err) = self.fail_generate.lock().clone() {
                return Err(err);
            }
            let first_line = span_text.lines().next().unwrap_or_default();
            let text = format!("[{file_id}] explains {first_line}");
            self.generated
                .lock()
                .insert(span_text.to_string(), text.clone());
            Ok(text)
        }

        async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
            if self.listed.lock().remove(file_id).is_none() {
                return Err(ServiceError::NotFound(file_id.to_string()));
            }
            Ok(())
        }

        async fn list_files(&self) -> Result<Vec<FileRecord>, ServiceError> {
            Ok(self
                .listed
                .lock()
                .keys()
                .map(|id| FileRecord {
                    id: id.clone(),
                    name: id.clone(),
                    file_name: None,
                    created_at: None,
                })
                .collect())
        }
    }
}
