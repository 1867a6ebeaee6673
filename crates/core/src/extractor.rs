use crate::error::{LoaderError, Result};
use crate::models::{DocumentType, Element, FormatFamily, PdfResolution, ProcessingConfig, Source};
use crate::ocr;
use crate::traits::{ExtractionBackend, OcrEngine};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeFormat {
    Docx,
    Pptx,
}

impl OfficeFormat {
    pub fn from_document_type(document_type: DocumentType) -> Option<Self> {
        match document_type {
            DocumentType::Doc | DocumentType::Docx => Some(Self::Docx),
            DocumentType::Ppt | DocumentType::Pptx => Some(Self::Pptx),
            _ => None,
        }
    }

    /// MIME label of the format the document is partitioned as.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Docx => DocumentType::Docx.mime_type(),
            Self::Pptx => DocumentType::Pptx.mime_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebTarget {
    Url(Url),
    File(PathBuf),
}

impl WebTarget {
    /// Bare domains such as `www.example.com` are fetched over https.
    pub fn resolve(source: &Source) -> Result<Self> {
        if !source.is_url() {
            return Ok(Self::File(source.path().to_path_buf()));
        }

        let identifier = source.identifier();
        let url = match Url::parse(identifier) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{identifier}"))?
            }
            Err(error) => return Err(error.into()),
        };
        Ok(Self::Url(url))
    }
}

/// Extraction strategy chosen for one source. Selection order matters: an image
/// goes to OCR when OCR is enabled and to the generic image partitioner otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Ocr,
    Pdf {
        resolution: PdfResolution,
        infer_tables: bool,
    },
    Spreadsheet,
    Web(WebTarget),
    Image,
    Email,
    Office(OfficeFormat),
    Generic(DocumentType),
}

impl Strategy {
    /// The first three checks use the identifier's own extension, so a URL
    /// ending in `.pdf` still goes to the PDF partitioner.
    pub fn select(source: &Source, config: &ProcessingConfig) -> Result<Self> {
        let family = source.family();
        let document_type = source.document_type();
        let named_family = source.extension_type().map(DocumentType::family);

        let strategy = if named_family == Some(FormatFamily::Image) && config.ocr_for_images {
            Self::Ocr
        } else if named_family == Some(FormatFamily::Pdf) {
            Self::Pdf {
                resolution: config.pdf_resolution,
                infer_tables: config.infer_tables,
            }
        } else if named_family == Some(FormatFamily::Spreadsheet) {
            Self::Spreadsheet
        } else if source.is_url() || family == FormatFamily::Web {
            Self::Web(WebTarget::resolve(source)?)
        } else if family == FormatFamily::Image {
            Self::Image
        } else if family == FormatFamily::Email {
            Self::Email
        } else if let Some(format) = OfficeFormat::from_document_type(document_type) {
            Self::Office(format)
        } else {
            Self::Generic(document_type)
        };

        Ok(strategy)
    }
}

/// Runs the selected strategy against the backend or OCR engine.
pub fn extract_elements(
    source: &Source,
    config: &ProcessingConfig,
    backend: &dyn ExtractionBackend,
    ocr_engine: Option<&dyn OcrEngine>,
) -> Result<Vec<Element>> {
    let strategy = Strategy::select(source, config)?;
    debug!(source = %source, strategy = ?strategy, "dispatching extraction");

    let elements = match strategy {
        Strategy::Ocr => {
            let engine = ocr_engine.ok_or_else(|| {
                LoaderError::OcrFailed("ocr is enabled but no engine was prepared".to_string())
            })?;
            let text = engine.extract_text(source.path())?;
            ocr::element_from_text(&text, source)
        }
        Strategy::Pdf {
            resolution,
            infer_tables,
        } => backend.partition_pdf(source, resolution, infer_tables)?,
        Strategy::Spreadsheet => backend
            .partition_spreadsheet(source)?
            .into_iter()
            .filter(|element| element.metadata.text_as_html.is_some())
            .collect(),
        Strategy::Web(target) => backend.partition_web(source, &target)?,
        Strategy::Image => backend.partition_image(source)?,
        Strategy::Email => backend.partition_email(source)?,
        Strategy::Office(format) => backend.partition_office(source, format)?,
        Strategy::Generic(document_type) => backend.partition_generic(source, document_type)?,
    };

    Ok(elements)
}

/// Extraction with failures downgraded to zero elements. The reason is logged.
pub fn extract_or_empty(
    source: &Source,
    config: &ProcessingConfig,
    backend: &dyn ExtractionBackend,
    ocr_engine: Option<&dyn OcrEngine>,
) -> Vec<Element> {
    match extract_elements(source, config, backend, ocr_engine) {
        Ok(elements) => elements,
        Err(error) => {
            let error = match error {
                error @ LoaderError::Extraction { .. } => error,
                other => LoaderError::extraction(source.identifier(), other),
            };
            warn!(source = %source, error = %error, "extraction produced no elements");
            Vec::new()
        }
    }
}

pub(crate) fn make_element_id(source_id: &str, page: u32, ordinal: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update((ordinal as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementCategory, OcrModel};
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingBackend {
        fn record(&self, call: String) -> Result<Vec<Element>> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail {
                return Err(LoaderError::PdfParse("corrupt".to_string()));
            }
            Ok(vec![Element::new("e", ElementCategory::NarrativeText, call)])
        }
    }

    impl ExtractionBackend for RecordingBackend {
        fn partition_pdf(&self, _: &Source, resolution: PdfResolution, infer: bool) -> Result<Vec<Element>> {
            self.record(format!("pdf:{}:{infer}", resolution.as_strategy()))
        }

        fn partition_spreadsheet(&self, _: &Source) -> Result<Vec<Element>> {
            let mut table = Element::new("t", ElementCategory::Table, "cells");
            table.metadata.text_as_html = Some("<table></table>".to_string());
            let plain = Element::new("p", ElementCategory::Title, "Sheet1");
            self.record("spreadsheet".to_string())?;
            Ok(vec![plain, table])
        }

        fn partition_web(&self, _: &Source, target: &WebTarget) -> Result<Vec<Element>> {
            match target {
                WebTarget::Url(url) => self.record(format!("web:{url}")),
                WebTarget::File(path) => self.record(format!("web-file:{}", path.display())),
            }
        }

        fn partition_image(&self, _: &Source) -> Result<Vec<Element>> {
            self.record("image".to_string())
        }

        fn partition_email(&self, _: &Source) -> Result<Vec<Element>> {
            self.record("email".to_string())
        }

        fn partition_office(&self, _: &Source, format: OfficeFormat) -> Result<Vec<Element>> {
            self.record(format!("office:{format:?}"))
        }

        fn partition_generic(&self, _: &Source, document_type: DocumentType) -> Result<Vec<Element>> {
            self.record(format!("generic:{}", document_type.extension()))
        }
    }

    struct FixedOcr;

    impl OcrEngine for FixedOcr {
        fn extract_text(&self, _path: &Path) -> Result<String> {
            Ok("recognized <text>".to_string())
        }
    }

    fn first_text(source: &str, config: &ProcessingConfig) -> String {
        let backend = RecordingBackend::default();
        let source = Source::new(source).unwrap();
        let elements = extract_elements(&source, config, &backend, Some(&FixedOcr)).unwrap();
        elements[0].text.clone()
    }

    #[test]
    fn ocr_takes_priority_over_image_partitioning() {
        let with_ocr = ProcessingConfig {
            ocr_for_images: true,
            ocr_model: OcrModel::Paddle,
            ..ProcessingConfig::default()
        };

        assert_eq!(first_text("scan.png", &with_ocr), "recognized <text>");
        assert_eq!(first_text("scan.png", &ProcessingConfig::default()), "image");
    }

    #[test]
    fn pdf_flags_are_forwarded() {
        let config = ProcessingConfig {
            pdf_resolution: PdfResolution::Fast,
            infer_tables: true,
            ..ProcessingConfig::default()
        };
        assert_eq!(first_text("paper.PDF", &config), "pdf:fast:true");
    }

    #[test]
    fn office_formats_are_sub_selected_by_extension() {
        let config = ProcessingConfig::default();
        assert_eq!(first_text("memo.doc", &config), "office:Docx");
        assert_eq!(first_text("deck.ppt", &config), "office:Pptx");
        assert_eq!(first_text("mail.msg", &config), "email");
        assert_eq!(first_text("notes.rst", &config), "generic:rst");
    }

    #[test]
    fn bare_domains_gain_a_scheme() {
        let config = ProcessingConfig::default();
        assert_eq!(first_text("www.example.com", &config), "web:https://www.example.com/");
        assert_eq!(
            first_text("http://example.com/a", &config),
            "web:http://example.com/a"
        );
        assert_eq!(first_text("saved/page.html", &config), "web-file:saved/page.html");
    }

    #[test]
    fn url_extension_is_checked_before_the_url_test() {
        let config = ProcessingConfig::default();
        let paper = Source::new("https://example.com/paper.pdf").unwrap();
        assert!(matches!(
            Strategy::select(&paper, &config).unwrap(),
            Strategy::Pdf { .. }
        ));

        let sheet = Source::new("https://example.com/budget.xlsx").unwrap();
        assert_eq!(Strategy::select(&sheet, &config).unwrap(), Strategy::Spreadsheet);

        let scan = Source::new("https://example.com/scan.png").unwrap();
        let with_ocr = ProcessingConfig {
            ocr_for_images: true,
            ..ProcessingConfig::default()
        };
        assert_eq!(Strategy::select(&scan, &with_ocr).unwrap(), Strategy::Ocr);
        assert!(matches!(
            Strategy::select(&scan, &config).unwrap(),
            Strategy::Web(WebTarget::Url(_))
        ));
    }

    #[test]
    fn spreadsheets_keep_only_table_elements() {
        let backend = RecordingBackend::default();
        let source = Source::new("budget.xlsx").unwrap();
        let elements =
            extract_elements(&source, &ProcessingConfig::default(), &backend, None).unwrap();

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].category, ElementCategory::Table);
    }

    #[test]
    fn backend_failures_become_zero_elements() {
        let backend = RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        };
        let source = Source::new("broken.pdf").unwrap();

        let elements = extract_or_empty(&source, &ProcessingConfig::default(), &backend, None);

        assert!(elements.is_empty());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn ocr_without_engine_is_an_extraction_failure() {
        let config = ProcessingConfig {
            ocr_for_images: true,
            ..ProcessingConfig::default()
        };
        let source = Source::new("scan.tiff").unwrap();
        let result = extract_elements(&source, &config, &RecordingBackend::default(), None);
        assert!(matches!(result, Err(LoaderError::OcrFailed(_))));
    }

    #[test]
    fn element_ids_are_deterministic() {
        let first = make_element_id("a.md", 1, 0, "text");
        assert_eq!(first, make_element_id("a.md", 1, 0, "text"));
        assert_ne!(first, make_element_id("a.md", 1, 1, "text"));
    }
}
