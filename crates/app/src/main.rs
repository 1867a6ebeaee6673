use chrono::Utc;
use clap::Parser;
use docminer_core::{
    backend_from_config, expand_inputs, BackendConfig, DocumentLoader, OcrModel, PdfResolution,
    ProcessingConfig,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docminer", version)]
struct Cli {
    /// Files, directories (searched recursively) or URLs to load.
    #[arg(required = true)]
    sources: Vec<String>,

    /// Maximum words per chunk; longer pages are split.
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// PDF partitioning strategy: hi_res or fast.
    #[arg(long, default_value = "hi_res")]
    pdf_resolution: PdfResolution,

    /// Ask the partitioner to infer table structure in PDFs.
    #[arg(long, default_value_t = false)]
    infer_tables: bool,

    /// Number of sources processed concurrently.
    #[arg(long, default_value = "4")]
    max_workers: usize,

    /// Drop elements categorized as page headers.
    #[arg(long, default_value_t = false)]
    remove_headers: bool,

    /// Drop the elements under a "References" title.
    #[arg(long, default_value_t = false)]
    remove_references: bool,

    /// Keep elements whose text is empty or whitespace.
    #[arg(long, default_value_t = false)]
    keep_empty_elements: bool,

    /// Run OCR on image sources instead of partitioning them.
    #[arg(long, default_value_t = false)]
    ocr: bool,

    /// OCR model: tesseract or paddle.
    #[arg(long, default_value = "tesseract")]
    ocr_model: OcrModel,

    /// Partition service URL; local extraction is used when unset.
    #[arg(long, env = "DOCMINER_PARTITION_URL")]
    partition_url: Option<String>,

    /// Partition service API key
    #[arg(long, env = "DOCMINER_PARTITION_API_KEY", hide_env_values = true)]
    partition_api_key: Option<String>,

    /// OCR service URL; required for the paddle model.
    #[arg(long, env = "DOCMINER_OCR_URL")]
    ocr_url: Option<String>,

    /// OCR service API key
    #[arg(long, env = "DOCMINER_OCR_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// Print document counts per source instead of the full JSON result.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

impl Cli {
    fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            chunk_size: self.chunk_size,
            pdf_resolution: self.pdf_resolution,
            infer_tables: self.infer_tables,
            custom_splitter: None,
            max_workers: self.max_workers,
            remove_headers: self.remove_headers,
            remove_references: self.remove_references,
            filter_empty_elements: !self.keep_empty_elements,
            ocr_for_images: self.ocr,
            ocr_model: self.ocr_model,
        }
    }

    fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            partition_url: self.partition_url.clone(),
            partition_api_key: self.partition_api_key.clone(),
            ocr_url: self.ocr_url.clone(),
            ocr_api_key: self.ocr_api_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "docminer boot"
    );

    let sources = expand_inputs(&cli.sources);
    if sources.is_empty() {
        anyhow::bail!("no supported sources found in {:?}", cli.sources);
    }

    let backend_config = cli.backend_config();
    let loader = DocumentLoader::new(sources)?
        .with_backend(backend_from_config(&backend_config))
        .with_backend_config(backend_config);

    let results = loader.process(Some(cli.processing_config())).await?;

    if cli.summary {
        let mut names: Vec<_> = results.keys().collect();
        names.sort();
        for name in names {
            let documents = &results[name];
            if documents.is_empty() {
                warn!(source = %name, "no documents produced");
            }
            println!("{name}: {} document(s)", documents.len());
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}
