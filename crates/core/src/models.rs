use crate::chunking::TextSplitter;
use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Every file extension the loader accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Bmp,
    Csv,
    Doc,
    Docx,
    Eml,
    Epub,
    Heic,
    Html,
    Jpeg,
    Markdown,
    Msg,
    Odt,
    Org,
    P7s,
    Pdf,
    Png,
    Ppt,
    Pptx,
    Rst,
    Rtf,
    Tiff,
    Text,
    Tsv,
    Xls,
    Xlsx,
    Xml,
}

impl DocumentType {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let kind = match extension.to_lowercase().as_str() {
            "bmp" => Self::Bmp,
            "csv" => Self::Csv,
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            "eml" => Self::Eml,
            "epub" => Self::Epub,
            "heic" => Self::Heic,
            "html" => Self::Html,
            "jpeg" | "jpg" => Self::Jpeg,
            "md" => Self::Markdown,
            "msg" => Self::Msg,
            "odt" => Self::Odt,
            "org" => Self::Org,
            "p7s" => Self::P7s,
            "pdf" => Self::Pdf,
            "png" => Self::Png,
            "ppt" => Self::Ppt,
            "pptx" => Self::Pptx,
            "rst" => Self::Rst,
            "rtf" => Self::Rtf,
            "tiff" => Self::Tiff,
            "txt" => Self::Text,
            "tsv" => Self::Tsv,
            "xls" => Self::Xls,
            "xlsx" => Self::Xlsx,
            "xml" => Self::Xml,
            _ => return None,
        };
        Some(kind)
    }

    /// Resolves a path or URL. URL-like identifiers are always treated as HTML.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        if is_url_like(identifier) {
            return Ok(Self::Html);
        }

        let extension = identifier_extension(identifier);
        Self::from_extension(extension)
            .ok_or_else(|| LoaderError::UnsupportedFormat(extension.to_lowercase()))
    }

    /// Type named by the identifier's own extension, URLs included.
    pub fn from_identifier_extension(identifier: &str) -> Option<Self> {
        Self::from_extension(identifier_extension(identifier))
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Self::Pdf => FormatFamily::Pdf,
            Self::Png | Self::Jpeg | Self::Tiff | Self::Bmp | Self::Heic => FormatFamily::Image,
            Self::Xlsx | Self::Xls => FormatFamily::Spreadsheet,
            Self::Html => FormatFamily::Web,
            Self::Eml | Self::Msg => FormatFamily::Email,
            Self::Doc | Self::Docx | Self::Ppt | Self::Pptx => FormatFamily::Office,
            _ => FormatFamily::Generic,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Ppt => "application/vnd.ms-powerpoint",
            Self::Html => "text/html",
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Xml => "application/xml",
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Rtf => "application/rtf",
            Self::Epub => "application/epub+zip",
            Self::Msg => "application/vnd.ms-outlook",
            Self::Eml => "message/rfc822",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Heic => "image/heic",
            Self::Odt | Self::Org | Self::P7s | Self::Rst => "application/octet-stream",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Csv => "csv",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Eml => "eml",
            Self::Epub => "epub",
            Self::Heic => "heic",
            Self::Html => "html",
            Self::Jpeg => "jpeg",
            Self::Markdown => "md",
            Self::Msg => "msg",
            Self::Odt => "odt",
            Self::Org => "org",
            Self::P7s => "p7s",
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
            Self::Rst => "rst",
            Self::Rtf => "rtf",
            Self::Tiff => "tiff",
            Self::Text => "txt",
            Self::Tsv => "tsv",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Xml => "xml",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    Pdf,
    Image,
    Spreadsheet,
    Web,
    Email,
    Office,
    Generic,
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Spreadsheet => "spreadsheet",
            Self::Web => "web",
            Self::Email => "email",
            Self::Office => "office",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

pub(crate) fn is_url_like(identifier: &str) -> bool {
    let lowered = identifier.to_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("www.")
}

fn identifier_extension(identifier: &str) -> &str {
    Path::new(identifier)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
}

/// A path or URL registered with the loader. The document type is resolved once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    identifier: String,
    document_type: DocumentType,
    extension_type: Option<DocumentType>,
}

impl Source {
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        let document_type = DocumentType::from_identifier(&identifier)?;
        let extension_type = DocumentType::from_identifier_extension(&identifier);
        Ok(Self {
            identifier,
            document_type,
            extension_type,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn family(&self) -> FormatFamily {
        self.document_type.family()
    }

    /// Type given by the trailing extension. Differs from `document_type` only
    /// for URLs, which are labelled HTML whatever their path ends in.
    pub fn extension_type(&self) -> Option<DocumentType> {
        self.extension_type
    }

    pub fn mime_type(&self) -> &'static str {
        self.document_type.mime_type()
    }

    pub fn is_url(&self) -> bool {
        is_url_like(&self.identifier)
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.identifier)
    }

    /// Final path component; this is the key of the processing result map.
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.identifier.clone())
    }

    pub fn file_directory(&self) -> String {
        self.path()
            .parent()
            .map(|parent| parent.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementCategory {
    Title,
    Header,
    Footer,
    NarrativeText,
    ListItem,
    Table,
    Text,
    Other(String),
}

impl ElementCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "Title",
            Self::Header => "Header",
            Self::Footer => "Footer",
            Self::NarrativeText => "NarrativeText",
            Self::ListItem => "ListItem",
            Self::Table => "Table",
            Self::Text => "text",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ElementCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Title" => Self::Title,
            "Header" => Self::Header,
            "Footer" => Self::Footer,
            "NarrativeText" => Self::NarrativeText,
            "ListItem" => Self::ListItem,
            "Table" => Self::Table,
            "text" => Self::Text,
            _ => Self::Other(value),
        }
    }
}

impl From<ElementCategory> for String {
    fn from(value: ElementCategory) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementMetadata {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub text_as_html: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_directory: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// One atomic unit produced by an extraction backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub category: ElementCategory,
    pub text: String,
    pub metadata: ElementMetadata,
}

impl Element {
    pub fn new(id: impl Into<String>, category: ElementCategory, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category,
            text: text.into(),
            metadata: ElementMetadata::default(),
        }
    }

    pub fn on_page(mut self, page_number: u32) -> Self {
        self.metadata.page_number = Some(page_number);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.metadata.parent_id = Some(parent_id.into());
        self
    }

    pub fn page_number(&self) -> u32 {
        self.metadata.page_number.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfResolution {
    #[default]
    HiRes,
    Fast,
}

impl PdfResolution {
    pub fn as_strategy(self) -> &'static str {
        match self {
            Self::HiRes => "hi_res",
            Self::Fast => "fast",
        }
    }
}

impl FromStr for PdfResolution {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "hi_res" | "hi-res" | "hires" => Ok(Self::HiRes),
            "fast" => Ok(Self::Fast),
            other => Err(LoaderError::InvalidConfig(format!(
                "unknown pdf resolution: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrModel {
    #[default]
    Tesseract,
    Paddle,
}

impl OcrModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Paddle => "paddle",
        }
    }
}

impl FromStr for OcrModel {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "paddle" => Ok(Self::Paddle),
            other => Err(LoaderError::InvalidConfig(format!("unknown ocr model: {other}"))),
        }
    }
}

/// Read once per `process` call.
#[derive(Clone)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub pdf_resolution: PdfResolution,
    pub infer_tables: bool,
    pub custom_splitter: Option<Arc<dyn TextSplitter>>,
    pub max_workers: usize,
    pub remove_headers: bool,
    pub remove_references: bool,
    pub filter_empty_elements: bool,
    pub ocr_for_images: bool,
    pub ocr_model: OcrModel,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            pdf_resolution: PdfResolution::HiRes,
            infer_tables: false,
            custom_splitter: None,
            max_workers: 4,
            remove_headers: false,
            remove_references: false,
            filter_empty_elements: true,
            ocr_for_images: false,
            ocr_model: OcrModel::Tesseract,
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(LoaderError::InvalidConfig(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(LoaderError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("chunk_size", &self.chunk_size)
            .field("pdf_resolution", &self.pdf_resolution)
            .field("infer_tables", &self.infer_tables)
            .field("custom_splitter", &self.custom_splitter.is_some())
            .field("max_workers", &self.max_workers)
            .field("remove_headers", &self.remove_headers)
            .field("remove_references", &self.remove_references)
            .field("filter_empty_elements", &self.filter_empty_elements)
            .field("ocr_for_images", &self.ocr_for_images)
            .field("ocr_model", &self.ocr_model)
            .finish()
    }
}

/// Endpoints for the network-backed collaborators.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub partition_url: Option<String>,
    pub partition_api_key: Option<String>,
    pub ocr_url: Option<String>,
    pub ocr_api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub filetype: String,
    pub page_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_number: Option<usize>,
    pub source: String,
}

/// A page, or a chunk of a page, ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}
