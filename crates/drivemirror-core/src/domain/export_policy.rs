//! Export policy for native Google document types
//!
//! Native documents (Docs, Sheets, Slides, Drawings, Apps Script) have no
//! downloadable bytes of their own; they are exported to one or more
//! concrete formats instead. The policy decides which formats, which file
//! extension each format gets, and which document types are never backed up.

use std::collections::{BTreeMap, HashMap};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Built-in document type to export formats table
const DEFAULT_EXPORT_FORMATS: &[(&str, &[&str])] = &[
    (
        "application/vnd.google-apps.document",
        &[
            "application/pdf",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.oasis.opendocument.text",
            "application/zip",
            "text/plain",
        ],
    ),
    (
        "application/vnd.google-apps.spreadsheet",
        &[
            "application/pdf",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/x-vnd.oasis.opendocument.spreadsheet",
            "application/zip",
            "text/csv",
        ],
    ),
    (
        "application/vnd.google-apps.presentation",
        &[
            "application/pdf",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "application/vnd.oasis.opendocument.presentation",
            "text/plain",
        ],
    ),
    (
        "application/vnd.google-apps.drawing",
        &["application/pdf", "image/jpeg", "image/png", "image/svg+xml"],
    ),
    (
        "application/vnd.google-apps.script",
        &["application/vnd.google-apps.script+json"],
    ),
];

/// Built-in export MIME type to file extension table
const DEFAULT_EXTENSIONS: &[(&str, &str)] = &[
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("application/vnd.oasis.opendocument.text", ".odt"),
    ("application/x-vnd.oasis.opendocument.spreadsheet", ".ods"),
    ("application/vnd.oasis.opendocument.presentation", ".odp"),
    ("application/pdf", ".pdf"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/svg+xml", ".svg"),
    ("application/rtf", ".rtf"),
    ("text/plain", ".txt"),
    ("text/csv", ".csv"),
    ("application/zip", ".zip"),
    ("application/vnd.google-apps.script+json", ".json"),
];

/// Document types that cannot be exported and are skipped entirely
const DEFAULT_DENYLIST: &[&str] = &[
    "application/vnd.google-apps.form",
    "application/vnd.google-apps.map",
    "application/vnd.google-apps.site",
];

/// Which documents are exported, to what, and under which extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPolicy {
    formats: HashMap<String, Vec<String>>,
    extensions: HashMap<String, String>,
    denylist: Vec<String>,
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self {
            formats: DEFAULT_EXPORT_FORMATS
                .iter()
                .map(|(doc, fmts)| {
                    (
                        (*doc).to_string(),
                        fmts.iter().map(|f| (*f).to_string()).collect(),
                    )
                })
                .collect(),
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(mime, ext)| ((*mime).to_string(), (*ext).to_string()))
                .collect(),
            denylist: DEFAULT_DENYLIST.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

impl ExportPolicy {
    /// Built-in defaults with per-document-type format overrides applied
    ///
    /// Each override replaces the whole format list of its document type.
    /// Overriding a type that has no built-in entry makes it exportable.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut policy = Self::default();
        for (doc_mime, formats) in overrides {
            policy.formats.insert(doc_mime.clone(), formats.clone());
        }
        policy
    }

    /// Returns true if documents of this type are never backed up
    #[must_use]
    pub fn is_denied(&self, mime_type: &str) -> bool {
        self.denylist.iter().any(|m| m == mime_type)
    }

    /// Export formats for a document type, or `None` if it is not exportable
    #[must_use]
    pub fn formats_for(&self, mime_type: &str) -> Option<&[String]> {
        self.formats.get(mime_type).map(Vec::as_slice)
    }

    /// File extension (with leading dot) for an export format
    ///
    /// Unknown formats fall back to the MIME subtype, e.g. `.epub+zip` for
    /// `application/epub+zip`, so configured overrides always get a name.
    #[must_use]
    pub fn extension_for(&self, export_mime: &str) -> String {
        match self.extensions.get(export_mime) {
            Some(ext) => ext.clone(),
            None => {
                let subtype = export_mime.rsplit('/').next().unwrap_or(export_mime);
                format!(".{subtype}")
            }
        }
    }
}
