//! Document Parser Module
//!
//! Pure Rust native text extraction from in-memory documents.
//!
//! ## Supported Formats
//! - PDF: embedded text layer via pdf-extract
//! - Word: .docx via docx-rs
//! - Text: text/plain (lossy UTF-8)
//!
//! Images and legacy .doc files have no native extractor; scanned PDFs yield
//! too little text. Both cases are reported so the engine can try OCR.

use super::types::SourceFile;
use super::validator::{normalize_mime, MIME_DOCX, MIME_PDF, MIME_TEXT};

/// Maximum text length to extract (to avoid memory issues with huge docs)
pub const MAX_TEXT_LENGTH: usize = 500_000;

/// PDF text shorter than this is treated as a scanned/image-only document
pub const MIN_PDF_TEXT_LENGTH: usize = 50;

/// Result of native parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Cleaned, truncated text
    pub text: String,
    pub word_count: usize,
    /// Rough page estimate, PDFs only
    pub page_count: Option<usize>,
}

impl ParsedDocument {
    fn from_text(text: String, page_count: Option<usize>) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            word_count,
            page_count,
        }
    }
}

/// What native extraction produced for a file
#[derive(Debug, Clone, PartialEq)]
pub enum NativeOutcome {
    /// Usable text
    Extracted(ParsedDocument),
    /// Text layer missing or too short to trust
    Insufficient { chars: usize },
    /// The parser rejected the file
    Failed(String),
    /// No native extractor exists for this type
    NoExtractor,
}

/// Format-specific native text extraction
pub trait NativeParser: Send + Sync {
    fn parse(&self, file: &SourceFile) -> NativeOutcome;
}

/// Native parser backed by pdf-extract and docx-rs
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    fn read_plain_text(&self, file: &SourceFile) -> NativeOutcome {
        let text = Self::clean_text(&String::from_utf8_lossy(&file.bytes));

        tracing::debug!(
            "[DocumentParser] Direct read: {} chars from {}",
            text.len(),
            file.name
        );

        if text.is_empty() {
            return NativeOutcome::Insufficient { chars: 0 };
        }

        NativeOutcome::Extracted(ParsedDocument::from_text(Self::truncate_text(&text), None))
    }

    /// Extract text from PDF using pdf-extract
    /// Wrapped in catch_unwind to handle panics from malformed PDFs
    fn extract_pdf(&self, file: &SourceFile) -> NativeOutcome {
        tracing::info!(
            "[DocumentParser] Starting PDF extraction: {} ({} bytes)",
            file.name,
            file.bytes.len()
        );

        // pdf-extract (and its cff-parser dependency) can panic on certain fonts/glyphs
        let bytes = &file.bytes;
        let text = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        })) {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                tracing::warn!("[DocumentParser] PDF extraction FAILED for {}: {}", file.name, e);
                return NativeOutcome::Failed(format!("PDF extraction failed: {}", e));
            }
            Err(_panic) => {
                tracing::error!(
                    "[DocumentParser] PDF extraction PANICKED for {} - likely malformed font/glyph",
                    file.name
                );
                return NativeOutcome::Failed(
                    "PDF extraction panicked - likely contains malformed fonts".to_string(),
                );
            }
        };

        let raw_len = text.len();
        let text = Self::clean_text(&text);

        tracing::info!(
            "[DocumentParser] PDF raw extraction: {} chars -> {} chars after cleaning from {}",
            raw_len,
            text.len(),
            file.name
        );

        if text.chars().count() < MIN_PDF_TEXT_LENGTH {
            tracing::warn!(
                "[DocumentParser] PDF text too short ({} chars < {}) - likely scanned/image: {}",
                text.len(),
                MIN_PDF_TEXT_LENGTH,
                file.name
            );
            return NativeOutcome::Insufficient {
                chars: text.chars().count(),
            };
        }

        let text = Self::truncate_text(&text);
        // Rough heuristic, pdf-extract does not report pages
        let page_count = (text.len() / 3000).max(1);

        NativeOutcome::Extracted(ParsedDocument::from_text(text, Some(page_count)))
    }

    /// Extract text from DOCX using docx-rs
    fn extract_docx(&self, file: &SourceFile) -> NativeOutcome {
        tracing::debug!("[DocumentParser] Extracting DOCX: {}", file.name);

        let doc = match docx_rs::read_docx(&file.bytes) {
            Ok(doc) => doc,
            Err(e) => return NativeOutcome::Failed(format!("Failed to parse DOCX: {}", e)),
        };

        let mut all_text = String::new();
        for child in &doc.document.children {
            Self::extract_docx_content(child, &mut all_text);
        }

        let text = Self::clean_text(&all_text);
        if text.is_empty() {
            return NativeOutcome::Insufficient { chars: 0 };
        }

        tracing::info!(
            "[DocumentParser] DOCX extracted: {} chars from {}",
            text.len(),
            file.name
        );

        NativeOutcome::Extracted(ParsedDocument::from_text(Self::truncate_text(&text), None))
    }

    fn push_runs(children: &[docx_rs::ParagraphChild], output: &mut String) {
        for child in children {
            match child {
                docx_rs::ParagraphChild::Run(run) => {
                    for run_child in &run.children {
                        if let docx_rs::RunChild::Text(text) = run_child {
                            output.push_str(&text.text);
                        }
                    }
                }
                docx_rs::ParagraphChild::Hyperlink(link) => Self::push_runs(&link.children, output),
                _ => {}
            }
        }
    }

    /// Walk paragraphs and tables of a DOCX body
    fn extract_docx_content(element: &docx_rs::DocumentChild, output: &mut String) {
        match element {
            docx_rs::DocumentChild::Paragraph(para) => {
                Self::push_runs(&para.children, output);
                output.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        for child in &tc.children {
                            if let docx_rs::TableCellContent::Paragraph(para) = child {
                                Self::push_runs(&para.children, output);
                                output.push_str(" | ");
                            }
                        }
                    }
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    /// Trim lines and drop blank ones
    pub fn clean_text(text: &str) -> String {
        text.lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Truncate text to max length, preserving word boundaries
    pub fn truncate_text(text: &str) -> String {
        if text.len() <= MAX_TEXT_LENGTH {
            return text.to_string();
        }

        let mut cut = MAX_TEXT_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = &text[..cut];

        // Prefer a paragraph, then a sentence, then a word boundary
        if let Some(pos) = truncated.rfind("\n\n") {
            return truncated[..pos].to_string();
        }
        if let Some(pos) = truncated.rfind(". ") {
            return truncated[..=pos].to_string();
        }
        if let Some(pos) = truncated.rfind(' ') {
            return truncated[..pos].to_string();
        }

        truncated.to_string()
    }
}

impl NativeParser for DocumentParser {
    fn parse(&self, file: &SourceFile) -> NativeOutcome {
        match normalize_mime(&file.mime_type).as_str() {
            MIME_TEXT => self.read_plain_text(file),
            MIME_PDF => self.extract_pdf(file),
            MIME_DOCX => self.extract_docx(file),
            _ => NativeOutcome::NoExtractor,
        }
    }
}
