//! Service layer: sketch ingestion and the external colorization client

pub mod colorization;
pub mod ingestion;

pub use colorization::{
    ColorizationBackend, ColorizationClient, ColorizationRequest, ColorizationResult,
    ColorizeError, ImagePayload,
};
pub use ingestion::{DisplayReference, IngestError, SketchAsset, SketchFile, SketchIngestor};
