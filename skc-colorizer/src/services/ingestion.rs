//! Sketch file ingestion
//!
//! Accepts a user-provided image, mints a display reference for it and
//! produces the base64 data-URL encoding on demand.
//!
//! Only one sketch is displayable at a time: uploading a new sketch releases
//! the display reference of the previous one.

use base64::Engine;
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Route prefix under which display references are served
pub const DISPLAY_PREFIX: &str = "/sketches";

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Declared (or sniffed) media type is not an image
    #[error("Not an image (media type: {})", .0.as_deref().unwrap_or("unknown"))]
    NotAnImage(Option<String>),

    /// Zero-length upload
    #[error("Sketch file is empty")]
    EmptyFile,

    /// Underlying file could not be read
    #[error("Failed to read sketch '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Validation errors are rejected at upload without any state change
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::NotAnImage(_) | IngestError::EmptyFile)
    }
}

/// Where the raw sketch bytes live
#[derive(Debug, Clone)]
enum SketchSource {
    /// Bytes received in an upload body
    Memory(Arc<Vec<u8>>),
    /// File on disk, read lazily
    Path(PathBuf),
}

/// Raw, user-provided sketch file (not yet validated)
#[derive(Debug, Clone)]
pub struct SketchFile {
    name: String,
    declared_type: Option<String>,
    source: SketchSource,
}

impl SketchFile {
    /// Sketch received as bytes, e.g. an HTTP upload body
    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type,
            source: SketchSource::Memory(Arc::new(bytes)),
        }
    }

    /// Sketch stored on disk; contents are read on demand
    pub fn from_path(path: impl Into<PathBuf>, declared_type: Option<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sketch".to_string());
        Self {
            name,
            declared_type,
            source: SketchSource::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media type, falling back to content sniffing
    fn resolve_media_type(&self) -> Result<Option<String>, IngestError> {
        if let Some(declared) = self
            .declared_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            // Drop parameters such as "; charset=binary"
            let essence = declared.split(';').next().unwrap_or(declared).trim();
            return Ok(Some(essence.to_ascii_lowercase()));
        }

        let sniffed = match &self.source {
            SketchSource::Memory(bytes) => infer::get(bytes),
            SketchSource::Path(path) => infer::get_from_path(path).map_err(|source| {
                IngestError::Read {
                    name: self.name.clone(),
                    source,
                }
            })?,
        };
        Ok(sniffed.map(|kind| kind.mime_type().to_string()))
    }

    fn is_empty(&self) -> Result<bool, IngestError> {
        match &self.source {
            SketchSource::Memory(bytes) => Ok(bytes.is_empty()),
            SketchSource::Path(path) => std::fs::metadata(path)
                .map(|meta| meta.len() == 0)
                .map_err(|source| IngestError::Read {
                    name: self.name.clone(),
                    source,
                }),
        }
    }

    fn known_size(&self) -> Option<u64> {
        match &self.source {
            SketchSource::Memory(bytes) => Some(bytes.len() as u64),
            SketchSource::Path(_) => None,
        }
    }

    /// Read the full file contents
    pub async fn read_bytes(&self) -> Result<Vec<u8>, IngestError> {
        match &self.source {
            SketchSource::Memory(bytes) => Ok(bytes.as_ref().clone()),
            SketchSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| IngestError::Read {
                        name: self.name.clone(),
                        source,
                    })
            }
        }
    }
}

/// Session-scoped locator for showing an uploaded sketch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayReference(String);

impl DisplayReference {
    fn for_id(id: Uuid) -> Self {
        Self(format!("{}/{}", DISPLAY_PREFIX, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, uploaded sketch
///
/// Replaced wholesale when the user uploads another file.
#[derive(Debug, Clone)]
pub struct SketchAsset {
    id: Uuid,
    generation: u64,
    display_ref: DisplayReference,
    media_type: String,
    file: Arc<SketchFile>,
}

impl SketchAsset {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Monotonic upload counter; a newer sketch always has a larger value
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn display_ref(&self) -> &DisplayReference {
        &self.display_ref
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> &str {
        self.file.name()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.file.known_size()
    }

    /// Encode the full sketch as a `data:<type>;base64,<payload>` URL
    ///
    /// Not cached: every call re-reads the file. Output is identical for
    /// identical contents.
    pub async fn encode_for_transfer(&self) -> Result<String, IngestError> {
        let bytes = self.file.read_bytes().await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        debug!(
            generation = self.generation,
            raw_bytes = bytes.len(),
            encoded_len = encoded.len(),
            "Encoded sketch for transfer"
        );

        Ok(format!("data:{};base64,{}", self.media_type, encoded))
    }
}

/// Displayable sketch looked up by display reference
#[derive(Debug, Clone)]
pub struct DisplayedSketch {
    pub media_type: String,
    file: Arc<SketchFile>,
}

impl DisplayedSketch {
    pub async fn read_bytes(&self) -> Result<Vec<u8>, IngestError> {
        self.file.read_bytes().await
    }
}

/// Sketch ingestion service
///
/// Cheap to clone; clones share the display-reference table.
#[derive(Clone, Default)]
pub struct SketchIngestor {
    displays: Arc<DashMap<Uuid, DisplayedSketch>>,
    next_generation: Arc<AtomicU64>,
}

impl SketchIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `file` and mint a new asset for it
    ///
    /// On success every previously minted display reference is released.
    /// On a validation failure nothing changes.
    pub fn upload(&self, file: SketchFile) -> Result<SketchAsset, IngestError> {
        let media_type = file.resolve_media_type()?;
        let media_type = match media_type {
            Some(t) if t.starts_with("image/") => t,
            other => return Err(IngestError::NotAnImage(other)),
        };

        if file.is_empty()? {
            return Err(IngestError::EmptyFile);
        }

        let id = Uuid::new_v4();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let file = Arc::new(file);

        let released = self.displays.len();
        self.displays.clear();
        self.displays.insert(
            id,
            DisplayedSketch {
                media_type: media_type.clone(),
                file: Arc::clone(&file),
            },
        );

        let asset = SketchAsset {
            id,
            generation,
            display_ref: DisplayReference::for_id(id),
            media_type,
            file,
        };

        info!(
            generation,
            file_name = %asset.file_name(),
            media_type = %asset.media_type,
            released_refs = released,
            "Sketch ingested"
        );

        Ok(asset)
    }

    /// Look up a live display reference by id
    pub fn resolve_display(&self, id: Uuid) -> Option<DisplayedSketch> {
        self.displays.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of live display references (0 or 1)
    pub fn live_display_count(&self) -> usize {
        self.displays.len()
    }
}
