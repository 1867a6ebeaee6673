use crate::aggregate::combine_by_page;
use crate::backends::LocalBackend;
use crate::chunking::build_documents;
use crate::error::{LoaderError, Result};
use crate::extractor::extract_or_empty;
use crate::filter::ElementFilter;
use crate::models::{BackendConfig, Document, ProcessingConfig, Source};
use crate::ocr::{build_ocr_engine, share_engine};
use crate::traits::{ExtractionBackend, OcrEngine};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Loads a fixed set of sources into page-level documents.
///
/// Sources are validated when the loader is built, so an unsupported extension
/// fails the whole batch before any work starts. Everything that can go wrong
/// afterwards is isolated per source: a source that fails to extract or process
/// maps to an empty list in the result.
pub struct DocumentLoader {
    sources: Vec<Source>,
    backend: Arc<dyn ExtractionBackend>,
    backend_config: BackendConfig,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl DocumentLoader {
    pub fn new<I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources = sources
            .into_iter()
            .map(Source::new)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sources,
            backend: Arc::new(LocalBackend),
            backend_config: BackendConfig::default(),
            ocr_engine: None,
        })
    }

    pub fn with_backend(mut self, backend: Arc<dyn ExtractionBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Endpoints used when an OCR engine has to be built for a run.
    pub fn with_backend_config(mut self, config: BackendConfig) -> Self {
        self.backend_config = config;
        self
    }

    /// Uses `engine` instead of building one from the config's OCR model.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_engine = Some(share_engine(engine));
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Runs every source through extract -> filter -> page grouping -> chunking on
    /// a pool of `max_workers` blocking workers and waits for all of them.
    ///
    /// The result has one key per source file name.
    pub async fn process(
        &self,
        config: Option<ProcessingConfig>,
    ) -> Result<HashMap<String, Vec<Document>>> {
        let config = Arc::new(config.unwrap_or_default());
        config.validate()?;

        let ocr_engine = self.prepare_ocr(&config)?;
        // Any positive count is valid; counts past the permit limit mean "unbounded".
        let workers = config.max_workers.min(Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(workers));

        info!(
            sources = self.sources.len(),
            workers,
            chunk_size = config.chunk_size,
            ocr = ocr_engine.is_some(),
            "processing sources"
        );

        let mut results: HashMap<String, Vec<Document>> = self
            .sources
            .iter()
            .map(|source| (source.file_name(), Vec::new()))
            .collect();

        let mut pending: FuturesUnordered<_> = self
            .sources
            .iter()
            .cloned()
            .map(|source| {
                let semaphore = Arc::clone(&semaphore);
                let config = Arc::clone(&config);
                let backend = Arc::clone(&self.backend);
                let ocr_engine = ocr_engine.clone();

                async move {
                    let key = source.file_name();
                    let source_id = source.identifier().to_string();
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(permit) => tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            process_source(&source, &config, backend.as_ref(), ocr_engine.as_deref())
                        })
                        .await
                        .unwrap_or_else(|error| {
                            Err(LoaderError::SourceProcessing {
                                source_id: source_id.clone(),
                                details: error.to_string(),
                            })
                        }),
                        Err(error) => Err(LoaderError::SourceProcessing {
                            source_id: source_id.clone(),
                            details: error.to_string(),
                        }),
                    };
                    (key, source_id, outcome)
                }
            })
            .collect();

        while let Some((key, source_id, outcome)) = pending.next().await {
            match outcome {
                Ok(documents) => {
                    debug!(source = %source_id, documents = documents.len(), "source done");
                    results.insert(key, documents);
                }
                Err(error) => {
                    warn!(source = %source_id, error = %error, "source failed; returning no documents");
                    results.insert(key, Vec::new());
                }
            }
        }

        Ok(results)
    }

    fn prepare_ocr(&self, config: &ProcessingConfig) -> Result<Option<Arc<dyn OcrEngine>>> {
        if !config.ocr_for_images {
            return Ok(None);
        }

        match &self.ocr_engine {
            Some(engine) => Ok(Some(Arc::clone(engine))),
            None => build_ocr_engine(config.ocr_model, &self.backend_config).map(Some),
        }
    }
}

/// One source's full pipeline. Extraction failures already degrade to zero
/// elements inside `extract_or_empty`.
pub fn process_source(
    source: &Source,
    config: &ProcessingConfig,
    backend: &dyn ExtractionBackend,
    ocr_engine: Option<&dyn OcrEngine>,
) -> Result<Vec<Document>> {
    let elements = extract_or_empty(source, config, backend, ocr_engine);
    let extracted = elements.len();

    let filtered = ElementFilter::from(config).apply(source.identifier(), elements);
    let pages = combine_by_page(filtered);
    let documents = build_documents(&pages, source, config);

    debug!(
        source = %source,
        extracted,
        pages = pages.len(),
        documents = documents.len(),
        "pipeline finished"
    );

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{OfficeFormat, WebTarget};
    use crate::models::{DocumentType, Element, ElementCategory, PdfResolution};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Serves a canned page per source and fails or panics on request.
    #[derive(Default)]
    struct FakeBackend {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl FakeBackend {
        fn serve(&self, source: &Source) -> Result<Vec<Element>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);

            let name = source.file_name();
            if name.starts_with("broken") {
                return Err(LoaderError::PdfParse("corrupt xref".to_string()));
            }
            if name.starts_with("panic") {
                panic!("adapter crashed");
            }

            Ok(vec![
                Element::new("h", ElementCategory::Header, "Running head").on_page(2),
                Element::new("a", ElementCategory::NarrativeText, "a b c d e").on_page(2),
                Element::new("t", ElementCategory::Title, name).on_page(1),
            ])
        }
    }

    impl ExtractionBackend for FakeBackend {
        fn partition_pdf(&self, source: &Source, _: PdfResolution, _: bool) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_spreadsheet(&self, source: &Source) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_web(&self, source: &Source, _: &WebTarget) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_image(&self, source: &Source) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_email(&self, source: &Source) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_office(&self, source: &Source, _: OfficeFormat) -> Result<Vec<Element>> {
            self.serve(source)
        }

        fn partition_generic(&self, source: &Source, _: DocumentType) -> Result<Vec<Element>> {
            self.serve(source)
        }
    }

    struct EchoOcr;

    impl OcrEngine for EchoOcr {
        fn extract_text(&self, path: &Path) -> Result<String> {
            Ok(format!("text from {}", path.display()))
        }
    }

    fn loader(sources: &[&str]) -> (DocumentLoader, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        let loader = DocumentLoader::new(sources.iter().copied())
            .expect("sources should be supported")
            .with_backend(backend.clone());
        (loader, backend)
    }

    #[test]
    fn unsupported_source_fails_construction() {
        let result = DocumentLoader::new(["a.pdf", "b.exe", "c.docx"]);
        assert!(matches!(result, Err(LoaderError::UnsupportedFormat(ext)) if ext == "exe"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_source_maps_to_empty_list() {
        let (loader, _) = loader(&["one.pdf", "broken.pdf", "three.docx"]);

        let results = loader.process(None).await.expect("process should succeed");

        let keys: HashSet<_> = results.keys().map(String::as_str).collect();
        assert_eq!(keys, HashSet::from(["one.pdf", "broken.pdf", "three.docx"]));
        assert!(results["broken.pdf"].is_empty());
        assert!(!results["one.pdf"].is_empty());
        assert!(!results["three.docx"].is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panicking_adapter_is_isolated() {
        let (loader, _) = loader(&["ok.pdf", "panic.pdf"]);

        let results = loader.process(None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results["panic.pdf"].is_empty());
        assert_eq!(results["ok.pdf"].len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pages_are_renumbered_and_chunked() {
        let (loader, _) = loader(&["/docs/report.pdf"]);
        let config = ProcessingConfig {
            chunk_size: 2,
            remove_headers: true,
            ..ProcessingConfig::default()
        };

        let results = loader.process(Some(config)).await.unwrap();
        let documents = &results["report.pdf"];

        let contents: Vec<_> = documents.iter().map(|doc| doc.page_content.as_str()).collect();
        assert_eq!(contents, vec!["report.pdf", "a b", "c d", "e"]);
        assert_eq!(documents[0].metadata.page_number, 1);
        assert_eq!(documents[0].metadata.chunk_number, None);
        assert_eq!(documents[3].metadata.page_number, 2);
        assert_eq!(documents[3].metadata.chunk_number, Some(3));
        assert_eq!(documents[3].metadata.source, "/docs/report.pdf");
        assert_eq!(documents[3].metadata.filetype, "application/pdf");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worker_pool_bounds_concurrency() {
        let names: Vec<String> = (0..8).map(|i| format!("doc{i}.pdf")).collect();
        let backend = Arc::new(FakeBackend::default());
        let loader = DocumentLoader::new(names.clone())
            .unwrap()
            .with_backend(backend.clone());
        let config = ProcessingConfig {
            max_workers: 2,
            ..ProcessingConfig::default()
        };

        let results = loader.process(Some(config)).await.unwrap();

        assert_eq!(results.len(), 8);
        assert!(backend.max_active.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn huge_worker_count_is_capped_not_fatal() {
        let (loader, _) = loader(&["a.pdf", "b.xlsx", "c.eml"]);
        let config = ProcessingConfig {
            max_workers: usize::MAX,
            ..ProcessingConfig::default()
        };

        let results = loader.process(Some(config)).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results, loader.process(None).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_runs_are_identical() {
        let (loader, _) = loader(&["a.pdf", "b.xlsx", "c.eml"]);

        let first = loader.process(None).await.unwrap();
        let second = loader.process(None).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ocr_engine_is_used_only_when_enabled() {
        let (loader, _) = loader(&["/scans/photo.jpg"]);
        let loader = loader.with_ocr_engine(Arc::new(EchoOcr));

        let config = ProcessingConfig {
            ocr_for_images: true,
            ..ProcessingConfig::default()
        };
        let with_ocr = loader.process(Some(config)).await.unwrap();
        assert_eq!(with_ocr["photo.jpg"][0].page_content, "text from /scans/photo.jpg");
        assert_eq!(with_ocr["photo.jpg"][0].metadata.filetype, "image/jpeg");

        let without_ocr = loader.process(None).await.unwrap();
        assert_eq!(without_ocr["photo.jpg"][0].page_content, "photo.jpg");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_up_front() {
        let (loader, backend) = loader(&["a.pdf"]);
        let config = ProcessingConfig {
            max_workers: 0,
            ..ProcessingConfig::default()
        };

        let result = loader.process(Some(config)).await;

        assert!(matches!(result, Err(LoaderError::InvalidConfig(_))));
        assert_eq!(backend.active.load(Ordering::SeqCst), 0);
    }
}
