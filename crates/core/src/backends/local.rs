use crate::error::{LoaderError, Result};
use crate::extractor::{make_element_id, OfficeFormat, WebTarget};
use crate::models::{DocumentType, Element, ElementCategory, PdfResolution, Source};
use crate::traits::ExtractionBackend;
use lopdf::Document as PdfDocument;
use regex::Regex;
use tracing::debug;

/// Extraction without any network service: PDFs through lopdf and plain-text
/// formats straight from disk. Other families report an extraction failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    fn unsupported(source: &Source) -> LoaderError {
        LoaderError::extraction(
            source.identifier(),
            format!("local backend does not support {} sources", source.family()),
        )
    }
}

impl ExtractionBackend for LocalBackend {
    fn partition_pdf(
        &self,
        source: &Source,
        resolution: PdfResolution,
        infer_tables: bool,
    ) -> Result<Vec<Element>> {
        debug!(
            source = %source,
            strategy = resolution.as_strategy(),
            infer_tables,
            "local pdf extraction ignores layout options"
        );

        let document = PdfDocument::load(source.path())
            .map_err(|error| LoaderError::PdfParse(error.to_string()))?;

        let mut elements = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| LoaderError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                let id = make_element_id(source.identifier(), page_no, elements.len(), &text);
                elements.push(Element::new(id, ElementCategory::NarrativeText, text).on_page(page_no));
            }
        }

        if elements.is_empty() {
            return Err(LoaderError::PdfParse(format!(
                "pdf had no readable page text: {source}"
            )));
        }

        Ok(elements)
    }

    fn partition_spreadsheet(&self, source: &Source) -> Result<Vec<Element>> {
        Err(Self::unsupported(source))
    }

    fn partition_web(&self, source: &Source, _target: &WebTarget) -> Result<Vec<Element>> {
        Err(Self::unsupported(source))
    }

    fn partition_image(&self, source: &Source) -> Result<Vec<Element>> {
        Err(Self::unsupported(source))
    }

    fn partition_email(&self, source: &Source) -> Result<Vec<Element>> {
        Err(Self::unsupported(source))
    }

    fn partition_office(&self, source: &Source, _format: OfficeFormat) -> Result<Vec<Element>> {
        Err(Self::unsupported(source))
    }

    fn partition_generic(&self, source: &Source, document_type: DocumentType) -> Result<Vec<Element>> {
        match document_type {
            DocumentType::Text
            | DocumentType::Markdown
            | DocumentType::Rst
            | DocumentType::Org
            | DocumentType::Csv
            | DocumentType::Tsv
            | DocumentType::Xml => {
                let raw = std::fs::read_to_string(source.path())?;
                text_elements(source, &raw, document_type == DocumentType::Markdown)
            }
            _ => Err(Self::unsupported(source)),
        }
    }
}

/// Form feeds separate pages and blank lines separate paragraphs. With
/// `markdown_headings`, `#` headings become titles that parent the paragraphs
/// up to the next heading.
fn text_elements(source: &Source, raw: &str, markdown_headings: bool) -> Result<Vec<Element>> {
    let paragraph_break = Regex::new(r"\n\s*\n")?;
    let mut elements = Vec::new();
    let mut current_title: Option<String> = None;

    for (index, page) in raw.split('\u{000c}').enumerate() {
        let page_no = (index + 1) as u32;

        for block in paragraph_break.split(page) {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            let (heading, body) = match block.split_once('\n') {
                Some((first, rest)) if markdown_headings && first.starts_with('#') => (Some(first), rest.trim()),
                None if markdown_headings && block.starts_with('#') => (Some(block), ""),
                _ => (None, block),
            };

            if let Some(heading) = heading {
                let text = heading.trim_start_matches('#').trim();
                let id = make_element_id(source.identifier(), page_no, elements.len(), text);
                current_title = Some(id.clone());
                elements.push(Element::new(id, ElementCategory::Title, text).on_page(page_no));
            }

            if body.is_empty() {
                continue;
            }

            let id = make_element_id(source.identifier(), page_no, elements.len(), body);
            let mut element = Element::new(id, ElementCategory::NarrativeText, body).on_page(page_no);
            if let Some(parent) = &current_title {
                element = element.with_parent(parent.clone());
            }
            elements.push(element);
        }
    }

    Ok(elements)
}
