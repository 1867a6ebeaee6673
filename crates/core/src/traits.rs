use crate::extractor::{OfficeFormat, WebTarget};
use crate::models::{DocumentType, Element, PdfResolution, Source};
use crate::LoaderError;
use std::path::Path;

/// Per-format-family partitioning capability.
///
/// Implementations return elements in document order. Errors are reported as-is;
/// the dispatcher decides how a failed extraction is folded into the run.
pub trait ExtractionBackend: Send + Sync {
    fn partition_pdf(
        &self,
        source: &Source,
        resolution: PdfResolution,
        infer_tables: bool,
    ) -> Result<Vec<Element>, LoaderError>;

    fn partition_spreadsheet(&self, source: &Source) -> Result<Vec<Element>, LoaderError>;

    fn partition_web(&self, source: &Source, target: &WebTarget) -> Result<Vec<Element>, LoaderError>;

    fn partition_image(&self, source: &Source) -> Result<Vec<Element>, LoaderError>;

    fn partition_email(&self, source: &Source) -> Result<Vec<Element>, LoaderError>;

    fn partition_office(
        &self,
        source: &Source,
        format: OfficeFormat,
    ) -> Result<Vec<Element>, LoaderError>;

    fn partition_generic(
        &self,
        source: &Source,
        document_type: DocumentType,
    ) -> Result<Vec<Element>, LoaderError>;
}

/// Plain-text recognition for image sources.
pub trait OcrEngine: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, LoaderError>;

    /// Whether concurrent `extract_text` calls are safe. Engines that return
    /// false are wrapped in a single-slot gate by the loader.
    fn is_concurrent(&self) -> bool {
        true
    }
}
