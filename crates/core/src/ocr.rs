use crate::error::{LoaderError, Result};
use crate::extractor::make_element_id;
use crate::models::{BackendConfig, Element, ElementCategory, ElementMetadata, OcrModel, Source};
use crate::traits::OcrEngine;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wraps recognized text into the single element an OCR'd image contributes.
pub fn element_from_text(text: &str, source: &Source) -> Vec<Element> {
    let metadata = ElementMetadata {
        page_number: Some(1),
        parent_id: None,
        text_as_html: Some(escape_html(text)),
        filename: Some(source.file_name()),
        file_directory: Some(source.file_directory()),
        filetype: Some(source.mime_type().to_string()),
        last_modified: Some(Utc::now().to_rfc3339()),
    };

    vec![Element {
        id: make_element_id(source.identifier(), 1, 0, text),
        category: ElementCategory::Text,
        text: text.to_string(),
        metadata,
    }]
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Runs the local `tesseract` binary and reads recognized text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }
}

impl TesseractOcr {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .output()
            .map_err(|error| {
                LoaderError::OcrFailed(format!("could not run {}: {error}", self.binary))
            })?;

        if !output.status.success() {
            return Err(LoaderError::OcrFailed(format!(
                "{} exited with {} for {}: {}",
                self.binary,
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest<'a> {
    image_base64: String,
    source_path: String,
    model: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: Option<String>,
}

/// OCR served over HTTP; the model name is forwarded with every request.
#[derive(Debug, Clone)]
pub struct HttpOcr {
    endpoint: String,
    api_key: Option<String>,
    model: OcrModel,
}

impl HttpOcr {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: OcrModel) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            model,
        }
    }
}

impl OcrEngine for HttpOcr {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let image = std::fs::read(path)?;
        let payload = OcrRequest {
            image_base64: STANDARD.encode(image),
            source_path: path.to_string_lossy().to_string(),
            model: self.model.as_str(),
        };

        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        let mut request = client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(LoaderError::OcrFailed(format!(
                "ocr request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: OcrResponse = response.json()?;
        payload.text.map(|text| text.trim().to_string()).ok_or_else(|| {
            LoaderError::OcrFailed(format!("ocr response had no text for {}", path.display()))
        })
    }
}

/// Serializes calls into an engine that is not safe to share across workers.
pub struct GatedOcr {
    inner: Arc<dyn OcrEngine>,
    gate: Mutex<()>,
}

impl GatedOcr {
    pub fn new(inner: Arc<dyn OcrEngine>) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }
}

impl OcrEngine for GatedOcr {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let _slot = self
            .gate
            .lock()
            .map_err(|_| LoaderError::OcrFailed("ocr gate poisoned".to_string()))?;
        self.inner.extract_text(path)
    }
}

/// Builds the engine for `model`. Tesseract runs locally unless an OCR endpoint
/// is configured; paddle is only reachable through the endpoint.
pub fn build_ocr_engine(model: OcrModel, backends: &BackendConfig) -> Result<Arc<dyn OcrEngine>> {
    let engine: Arc<dyn OcrEngine> = match (&backends.ocr_url, model) {
        (Some(url), _) => Arc::new(HttpOcr::new(url, backends.ocr_api_key.clone(), model)),
        (None, OcrModel::Tesseract) => Arc::new(TesseractOcr::default()),
        (None, OcrModel::Paddle) => {
            return Err(LoaderError::InvalidConfig(
                "the paddle ocr model requires an ocr endpoint".to_string(),
            ))
        }
    };
    Ok(share_engine(engine))
}

pub(crate) fn share_engine(engine: Arc<dyn OcrEngine>) -> Arc<dyn OcrEngine> {
    if engine.is_concurrent() {
        engine
    } else {
        Arc::new(GatedOcr::new(engine))
    }
}
