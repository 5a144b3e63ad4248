//! Interactive session state: source text, detected spans, selection, and loaded file.

use std::sync::Arc;

use crate::app::annotations::AnnotationCoordinator;
use crate::app::detect::{LanguageHint, StructureDetector};
use crate::app::registry::SpanRegistry;
use crate::app::selection::SelectionState;
use crate::domain::errors::DomainError;
use crate::domain::model::{FileRecord, Span};

/// Everything an asynchronous annotation request needs, captured at the time it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRequest {
    pub file_id: String,
    pub span: Span,
}

/// Owns the text being annotated and the state derived from it.
///
/// Spans are recomputed wholesale whenever the text changes; the selection is dropped if its
/// span did not survive.
#[derive(Debug)]
pub struct AnnotatorSession {
    detector: StructureDetector,
    language: LanguageHint,
    text: String,
    registry: SpanRegistry,
    selection: SelectionState,
    file_id: Option<String>,
    coordinator: AnnotationCoordinator,
}

impl AnnotatorSession {
    pub fn new(
        detector: StructureDetector,
        language: LanguageHint,
        coordinator: AnnotationCoordinator,
    ) -> Self {
        Self {
            detector,
            language,
            text: String::new(),
            registry: SpanRegistry::default(),
            selection: SelectionState::new(),
            file_id: None,
            coordinator,
        }
    }

    /// Replace the source text and re-detect. Returns `true` when the selection was cleared.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        self.text = text.into();
        self.redetect()
    }

    pub fn set_language(&mut self, language: LanguageHint) -> bool {
        self.language = language;
        self.redetect()
    }

    /// Switch to a different remote file: annotations and selection are dropped.
    pub fn load_file(&mut self, file_id: impl Into<String>, text: impl Into<String>) {
        let file_id = file_id.into();
        tracing::info!(file_id = %file_id, "loading file");
        self.coordinator.switch_file(Some(&file_id));
        self.file_id = Some(file_id);
        self.selection.clear();
        self.set_text(text);
    }

    /// Upload `text` under `name` and load it as the current file.
    pub async fn upload(&mut self, name: &str, text: String) -> Result<FileRecord, DomainError> {
        let service = self.coordinator.service();
        let record = service.upload_file(name, &text).await.inspect_err(|err| {
            tracing::warn!(error = %err, name, "upload failed");
        })?;
        tracing::info!(file_id = %record.id, name, "uploaded source");
        self.load_file(record.id.clone(), text);
        Ok(record)
    }

    pub fn select_line(&mut self, line: usize) -> Result<&Span, DomainError> {
        self.selection.select_line(&self.registry, line)
    }

    pub fn select_name(&mut self, name: &str) -> Result<&Span, DomainError> {
        self.selection.select_name(&self.registry, name)
    }

    pub fn select_index(&mut self, index: usize) -> Option<&Span> {
        self.selection.select_index(&self.registry, index)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Snapshot of the selected span and loaded file for an annotation request.
    pub fn annotation_request(&self) -> Result<AnnotationRequest, DomainError> {
        let span = self.selection.selected().ok_or(DomainError::NoSelection)?;
        let file_id = self.file_id.as_ref().ok_or(DomainError::NoFileLoaded)?;
        Ok(AnnotationRequest {
            file_id: file_id.clone(),
            span: span.clone(),
        })
    }

    /// Whether a request issued earlier still matches the loaded file and selection.
    pub fn is_current(&self, request: &AnnotationRequest) -> bool {
        self.file_id.as_deref() == Some(request.file_id.as_str())
            && self.selection.is_selected(&request.span)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> LanguageHint {
        self.language
    }

    pub fn registry(&self) -> &SpanRegistry {
        &self.registry
    }

    pub fn spans(&self) -> &[Span] {
        self.registry.spans()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selected(&self) -> Option<&Span> {
        self.selection.selected()
    }

    /// Registry index of the selected span.
    pub fn selected_index(&self) -> Option<usize> {
        self.selection
            .selected()
            .and_then(|span| self.registry.position(span))
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    pub fn coordinator(&self) -> &AnnotationCoordinator {
        &self.coordinator
    }

    pub fn detector(&self) -> &StructureDetector {
        &self.detector
    }

    fn redetect(&mut self) -> bool {
        self.registry = self.detector.detect_registry(&self.text, self.language);
        self.selection.revalidate(&self.registry)
    }
}
