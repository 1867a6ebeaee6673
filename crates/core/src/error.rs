use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("extraction failed for {source_id}: {details}")]
    Extraction { source_id: String, details: String },

    #[error("could not process references: {0}")]
    ReferenceFilter(String),

    #[error("failed to process {source_id}: {details}")]
    SourceProcessing { source_id: String, details: String },

    #[error("invalid processing config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LoaderError {
    pub fn extraction(source_id: impl Into<String>, details: impl ToString) -> Self {
        Self::Extraction {
            source_id: source_id.into(),
            details: details.to_string(),
        }
    }
}

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;
