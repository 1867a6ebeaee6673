use crate::aggregate::PageText;
use crate::models::{Document, DocumentMetadata, ProcessingConfig, Source};

/// Turns a page of text into ordered pieces of at most `max_tokens` words.
pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str, max_tokens: usize) -> Vec<String>;
}

impl<F> TextSplitter for F
where
    F: Fn(&str, usize) -> Vec<String> + Send + Sync,
{
    fn split(&self, text: &str, max_tokens: usize) -> Vec<String> {
        self(text, max_tokens)
    }
}

/// Greedy word packer used when no custom splitter is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountSplitter;

impl TextSplitter for WordCountSplitter {
    fn split(&self, text: &str, max_tokens: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_count = 0usize;

        for word in text.split_whitespace() {
            let word_count = word_count(word);
            if current_count + word_count > max_tokens {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                }
                current.clear();
                current.push(word);
                current_count = word_count;
            } else {
                current.push(word);
                current_count += word_count;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn needs_chunking(text: &str, chunk_size: usize) -> bool {
    word_count(text) > chunk_size
}

/// Emits one document per page, or one per chunk when the page is over `chunk_size` words.
/// Page numbers are positions in `pages`, starting at 1.
pub fn build_documents(pages: &[PageText], source: &Source, config: &ProcessingConfig) -> Vec<Document> {
    let filename = source.file_name();
    let filetype = source.mime_type();
    let mut documents = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        let page_number = index + 1;
        let metadata = |chunk_number: Option<usize>| DocumentMetadata {
            filename: filename.clone(),
            filetype: filetype.to_string(),
            page_number,
            chunk_number,
            source: source.identifier().to_string(),
        };

        if !needs_chunking(&page.text, config.chunk_size) {
            documents.push(Document {
                page_content: page.text.clone(),
                metadata: metadata(None),
            });
            continue;
        }

        let chunks = match &config.custom_splitter {
            Some(splitter) => splitter.split(&page.text, config.chunk_size),
            None => WordCountSplitter.split(&page.text, config.chunk_size),
        };

        tracing::debug!(
            source = %source,
            page = page.number,
            chunks = chunks.len(),
            "page split into chunks"
        );

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            documents.push(Document {
                page_content: chunk,
                metadata: metadata(Some(chunk_index + 1)),
            });
        }
    }

    documents
}
