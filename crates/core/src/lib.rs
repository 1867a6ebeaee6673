pub mod aggregate;
pub mod backends;
pub mod chunking;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod traits;

pub use aggregate::{combine_by_page, PageText};
pub use backends::{backend_from_config, LocalBackend, PartitionApiBackend};
pub use chunking::{build_documents, needs_chunking, word_count, TextSplitter, WordCountSplitter};
pub use discovery::{discover_sources, expand_inputs};
pub use error::{LoaderError, Result};
pub use extractor::{extract_elements, extract_or_empty, OfficeFormat, Strategy, WebTarget};
pub use filter::ElementFilter;
pub use models::{
    BackendConfig, Document, DocumentMetadata, DocumentType, Element, ElementCategory,
    ElementMetadata, FormatFamily, OcrModel, PdfResolution, ProcessingConfig, Source,
};
pub use ocr::{build_ocr_engine, element_from_text, GatedOcr, HttpOcr, TesseractOcr};
pub use orchestrator::{process_source, DocumentLoader};
pub use traits::{ExtractionBackend, OcrEngine};
