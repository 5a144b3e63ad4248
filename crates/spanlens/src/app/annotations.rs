//! Per-file annotation cache with request coalescing and stale-result detection.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::app::service::AnnotationService;
use crate::domain::errors::ServiceError;
use crate::domain::model::{AnnotationEntry, Span};

type InFlight = Shared<BoxFuture<'static, Result<Resolution, ServiceError>>>;

/// Where a resolved annotation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already in the cache; no request was made.
    Cached(String),
    /// Adopted from the service's list of existing annotations.
    Listed(String),
    /// Freshly generated by the service.
    Generated(String),
    /// The file changed while the request was suspended; the result was discarded.
    Stale,
}

impl Resolution {
    pub fn text(&self) -> Option<&str> {
        match self {
            Resolution::Cached(text) | Resolution::Listed(text) | Resolution::Generated(text) => {
                Some(text)
            }
            Resolution::Stale => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Resolution::Cached(text) | Resolution::Listed(text) | Resolution::Generated(text) => {
                Some(text)
            }
            Resolution::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Resolution::Stale)
    }
}

/// Lifecycle of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    Resolving,
    Resolved,
}

#[derive(Default)]
struct CacheState {
    file_id: Option<String>,
    epoch: u64,
    entries: HashMap<String, String>,
    in_flight: HashMap<String, InFlight>,
}

/// Resolves annotation text for spans of the loaded file.
///
/// The cache lives as long as the loaded file and is unbounded; [`switch_file`] drops it
/// wholesale. Concurrent requests for the same name share one in-flight request.
///
/// [`switch_file`]: AnnotationCoordinator::switch_file
#[derive(Clone)]
pub struct AnnotationCoordinator {
    service: Arc<dyn AnnotationService>,
    state: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for AnnotationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AnnotationCoordinator")
            .field("file_id", &state.file_id)
            .field("epoch", &state.epoch)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

impl AnnotationCoordinator {
    pub fn new(service: Arc<dyn AnnotationService>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn service(&self) -> Arc<dyn AnnotationService> {
        Arc::clone(&self.service)
    }

    pub fn file_id(&self) -> Option<String> {
        self.state.lock().file_id.clone()
    }

    /// Drop every cached and in-flight annotation and start tracking `file_id`.
    pub fn switch_file(&self, file_id: Option<&str>) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.in_flight.clear();
        state.epoch += 1;
        state.file_id = file_id.map(str::to_string);
        tracing::info!(file_id = ?state.file_id, epoch = state.epoch, "annotation cache reset");
    }

    /// Resolve the annotation for `span` of `file_id`.
    ///
    /// Order: cache, then the service's existing annotations (all of which are adopted), then
    /// generation. A failed generation leaves the entry absent so the next call retries.
    pub async fn resolve(&self, span: &Span, file_id: &str) -> Result<Resolution, ServiceError> {
        let key = cache_key(span);
        let (request, epoch) = {
            let mut state = self.state.lock();
            match state.file_id.as_deref() {
                Some(current) if current != file_id => {
                    tracing::warn!(file_id, current, "resolve for a file that is no longer loaded");
                    return Ok(Resolution::Stale);
                }
                Some(_) => {}
                None => state.file_id = Some(file_id.to_string()),
            }

            if let Some(text) = state.entries.get(&key) {
                return Ok(Resolution::Cached(text.clone()));
            }

            let epoch = state.epoch;
            let request = match state.in_flight.get(&key) {
                Some(request) => {
                    tracing::debug!(name = %key, "joining in-flight annotation request");
                    request.clone()
                }
                None => {
                    let request = self
                        .fetch(key.clone(), span.full_text.clone(), file_id.to_string(), epoch)
                        .shared();
                    state.in_flight.insert(key, request.clone());
                    request
                }
            };
            (request, epoch)
        };

        let outcome = request.await;
        if self.state.lock().epoch != epoch {
            tracing::warn!(name = %span.name, "discarding annotation for a replaced file");
            return Ok(Resolution::Stale);
        }
        outcome
    }

    /// Ask for a more detailed explanation of `span` given its `current` annotation.
    ///
    /// The answer is not cached.
    pub async fn say_more(
        &self,
        span: &Span,
        file_id: &str,
        current: &str,
    ) -> Result<Resolution, ServiceError> {
        let epoch = {
            let state = self.state.lock();
            if state.file_id.as_deref().is_some_and(|loaded| loaded != file_id) {
                return Ok(Resolution::Stale);
            }
            state.epoch
        };

        let prompt = follow_up_prompt(span, current);
        let text = self
            .service
            .generate_annotation(file_id, &prompt)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, name = %span.name, "detail request failed"))?;

        if self.state.lock().epoch != epoch {
            return Ok(Resolution::Stale);
        }
        Ok(Resolution::Generated(text))
    }

    pub fn state(&self, span: &Span) -> EntryState {
        let key = cache_key(span);
        let state = self.state.lock();
        if state.entries.contains_key(&key) {
            EntryState::Resolved
        } else if state.in_flight.contains_key(&key) {
            EntryState::Resolving
        } else {
            EntryState::Absent
        }
    }

    pub fn get(&self, span: &Span) -> Option<String> {
        self.state.lock().entries.get(&cache_key(span)).cloned()
    }

    /// Snapshot of every resolved entry, sorted by name.
    pub fn entries(&self) -> Vec<AnnotationEntry> {
        let state = self.state.lock();
        let mut entries: Vec<AnnotationEntry> = state
            .entries
            .iter()
            .map(|(name, text)| AnnotationEntry {
                name: name.clone(),
                text: text.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn fetch(
        &self,
        key: String,
        span_text: String,
        file_id: String,
        epoch: u64,
    ) -> BoxFuture<'static, Result<Resolution, ServiceError>> {
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        async move {
            let result =
                lookup_or_generate(service.as_ref(), &state, &key, &span_text, &file_id, epoch).await;
            {
                let mut guard = state.lock();
                if guard.epoch == epoch {
                    guard.in_flight.remove(&key);
                }
            }
            if let Err(err) = &result {
                tracing::warn!(error = %err, name = %key, "annotation request failed");
            }
            result
        }
        .boxed()
    }
}

async fn lookup_or_generate(
    service: &dyn AnnotationService,
    state: &Mutex<CacheState>,
    key: &str,
    span_text: &str,
    file_id: &str,
    epoch: u64,
) -> Result<Resolution, ServiceError> {
    let records = service.list_annotations(file_id).await?;
    {
        let mut guard = state.lock();
        if guard.epoch != epoch {
            return Ok(Resolution::Stale);
        }
        let adopted = records.len();
        for record in records {
            guard.entries.insert(record.name, record.text);
        }
        tracing::debug!(file_id, adopted, "adopted listed annotations");
        if let Some(text) = guard.entries.get(key) {
            return Ok(Resolution::Listed(text.clone()));
        }
    }

    let text = service.generate_annotation(file_id, span_text).await?;
    let mut guard = state.lock();
    if guard.epoch != epoch {
        return Ok(Resolution::Stale);
    }
    guard.entries.insert(key.to_string(), text.clone());
    Ok(Resolution::Generated(text))
}

/// Cache key for a span. Anonymous spans are told apart by their start line.
pub fn cache_key(span: &Span) -> String {
    if span.is_anonymous() {
        format!("{}@{}", span.name, span.line_start)
    } else {
        span.name.clone()
    }
}

fn follow_up_prompt(span: &Span, current: &str) -> String {
    format!(
        "{code}\n\nCurrent explanation of {name}:\n{current}\n\nExplain {name} in more detail.",
        code = span.full_text,
        name = span.name,
        current = current.trim(),
    )
}
