use crate::error::{LoaderError, Result};
use crate::extractor::{OfficeFormat, WebTarget};
use crate::models::{DocumentType, Element, ElementCategory, ElementMetadata, PdfResolution, Source};
use crate::traits::ExtractionBackend;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Deserialize)]
struct PartitionedElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    element_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    metadata: ElementMetadata,
}

/// Client for an Unstructured-compatible partition service
/// (`POST /general/v0/general`, multipart upload, JSON element array back).
#[derive(Debug, Clone)]
pub struct PartitionApiBackend {
    endpoint: String,
    api_key: Option<String>,
}

impl PartitionApiBackend {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Uploads the source. URL sources (a `.pdf` link, say) are downloaded first.
    fn partition_file(&self, source: &Source, fields: &[(&str, String)]) -> Result<Vec<Element>> {
        let bytes = match WebTarget::resolve(source)? {
            WebTarget::Url(url) => fetch(&url)?,
            WebTarget::File(path) => std::fs::read(path)?,
        };
        self.partition_bytes(source, &source.file_name(), bytes, fields)
    }

    fn partition_bytes(
        &self,
        source: &Source,
        file_name: &str,
        bytes: Vec<u8>,
        fields: &[(&str, String)],
    ) -> Result<Vec<Element>> {
        let mut form = Form::new().part("files", Part::bytes(bytes).file_name(file_name.to_string()));
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut request = client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .multipart(form);

        if let Some(api_key) = &self.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LoaderError::extraction(
                source.identifier(),
                format!("partition service returned {status}: {body}"),
            ));
        }

        let elements = parse_elements(&response.bytes()?)?;
        debug!(source = %source, elements = elements.len(), "partition service responded");
        Ok(elements)
    }
}

fn fetch(url: &Url) -> Result<Vec<u8>> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let body = client.get(url.as_str()).send()?.error_for_status()?.bytes()?;
    Ok(body.to_vec())
}

fn office_fields(format: OfficeFormat) -> Vec<(&'static str, String)> {
    vec![("content_type", format.mime_type().to_string())]
}

fn parse_elements(body: &[u8]) -> Result<Vec<Element>> {
    let raw: Vec<PartitionedElement> = serde_json::from_slice(body)?;
    Ok(into_elements(raw))
}

fn into_elements(raw: Vec<PartitionedElement>) -> Vec<Element> {
    raw.into_iter()
        .map(|item| Element {
            id: item.element_id.unwrap_or_default(),
            category: ElementCategory::from(item.element_type),
            text: item.text.unwrap_or_default(),
            metadata: item.metadata,
        })
        .collect()
}

impl ExtractionBackend for PartitionApiBackend {
    fn partition_pdf(
        &self,
        source: &Source,
        resolution: PdfResolution,
        infer_tables: bool,
    ) -> Result<Vec<Element>> {
        self.partition_file(
            source,
            &[
                ("strategy", resolution.as_strategy().to_string()),
                ("pdf_infer_table_structure", infer_tables.to_string()),
            ],
        )
    }

    fn partition_spreadsheet(&self, source: &Source) -> Result<Vec<Element>> {
        self.partition_file(source, &[])
    }

    fn partition_web(&self, source: &Source, target: &WebTarget) -> Result<Vec<Element>> {
        match target {
            WebTarget::File(_) => self.partition_file(source, &[]),
            WebTarget::Url(url) => {
                let html = fetch(url)?;
                self.partition_bytes(source, "index.html", html, &[])
            }
        }
    }

    fn partition_image(&self, source: &Source) -> Result<Vec<Element>> {
        self.partition_file(source, &[("strategy", PdfResolution::HiRes.as_strategy().to_string())])
    }

    fn partition_email(&self, source: &Source) -> Result<Vec<Element>> {
        self.partition_file(source, &[])
    }

    fn partition_office(&self, source: &Source, format: OfficeFormat) -> Result<Vec<Element>> {
        debug!(source = %source, format = ?format, "partitioning office document");
        self.partition_file(source, &office_fields(format))
    }

    fn partition_generic(&self, source: &Source, document_type: DocumentType) -> Result<Vec<Element>> {
        self.partition_file(
            source,
            &[("content_type", document_type.mime_type().to_string())],
        )
    }
}
