//! Documents known to the backend and the user's selection among them.

use serde::{Deserialize, Serialize};

/// Message shown when the document listing cannot be fetched.
pub const FETCH_ERROR_MESSAGE: &str =
    "Não foi possível carregar os documentos. Por favor, tente novamente.";

/// A document as listed by `GET /api/documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Original file name, without the backend's storage prefix.
    pub filename: String,
    /// Upload time as formatted by the backend.
    pub upload_time: String,
    /// Backend path, used as the document's identity.
    pub file_path: String,
    /// Size in bytes.
    pub size: u64,
}

impl DocumentInfo {
    /// Icon for the document's file type.
    pub fn icon(&self) -> &'static str {
        document_icon(&self.filename)
    }
}

/// Ordered set of selected document paths.
///
/// Selection order is kept so the outbound `file_paths` list follows the
/// order in which the user picked documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSelection {
    paths: Vec<String>,
}

impl DocumentSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Flip the selection of `path`. Returns true if it is now selected.
    pub fn toggle(&mut self, path: &str) -> bool {
        if let Some(pos) = self.paths.iter().position(|p| p == path) {
            self.paths.remove(pos);
            false
        } else {
            self.paths.push(path.to_string());
            true
        }
    }

    /// Replace the selection with every listed document.
    pub fn select_all(&mut self, documents: &[DocumentInfo]) {
        self.paths = documents.iter().map(|d| d.file_path.clone()).collect();
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }
}

/// What the document sidebar should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryView<'a> {
    /// First fetch still running.
    Loading,
    /// Last fetch failed.
    Error(&'a str),
    /// Nothing uploaded yet.
    Empty,
    /// Documents available.
    Listing,
}

/// Polled document listing plus the local selection.
#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    pub documents: Vec<DocumentInfo>,
    pub selection: DocumentSelection,
    loading: bool,
    error: Option<String>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    /// A fetch was started.
    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// A fetch returned a listing.
    pub fn apply_listing(&mut self, documents: Vec<DocumentInfo>) {
        self.documents = documents;
        self.error = None;
        self.loading = false;
    }

    /// A fetch failed. The previous listing is kept but hidden behind the
    /// error until the next successful poll.
    pub fn apply_failure(&mut self) {
        self.error = Some(FETCH_ERROR_MESSAGE.to_string());
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> RegistryView<'_> {
        if self.loading && self.documents.is_empty() {
            RegistryView::Loading
        } else if let Some(error) = self.error.as_deref() {
            RegistryView::Error(error)
        } else if self.documents.is_empty() {
            RegistryView::Empty
        } else {
            RegistryView::Listing
        }
    }

    /// True when there is at least one document and all are selected.
    pub fn all_selected(&self) -> bool {
        !self.documents.is_empty()
            && self
                .documents
                .iter()
                .all(|d| self.selection.contains(&d.file_path))
    }

    /// Select-all checkbox: check selects every document, uncheck clears.
    pub fn set_all(&mut self, checked: bool) {
        if checked {
            self.selection.select_all(&self.documents);
        } else {
            self.selection.clear();
        }
    }

    /// Toggle the select-all checkbox.
    pub fn toggle_all(&mut self) {
        let checked = !self.all_selected();
        self.set_all(checked);
    }

    /// Toggle the document at `index` in the listing.
    pub fn toggle_at(&mut self, index: usize) -> Option<bool> {
        let path = self.documents.get(index)?.file_path.clone();
        Some(self.selection.toggle(&path))
    }

    pub fn selected_paths(&self) -> &[String] {
        self.selection.as_slice()
    }
}

/// Human readable size, base 1024, at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Icon for a file name, by extension.
pub fn document_icon(filename: &str) -> &'static str {
    if filename.ends_with(".pdf") {
        "📄"
    } else if filename.ends_with(".md") {
        "📝"
    } else if filename.ends_with(".txt") {
        "📃"
    } else {
        "📑"
    }
}
