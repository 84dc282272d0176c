//! Plain-text extraction from uploaded resume files.
//!
//! Strategies are chosen by extension and tried in order; the first one that yields
//! non-empty text wins. Extraction never fails: when nothing works the result is an
//! empty string. The work is blocking (file IO, PDF decoding), so async callers go
//! through [`extract_text_from_bytes`].

use std::fs::File;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;
use tracing::{debug, warn};

/// Raw-decoded `.doc` output shorter than this is treated as noise.
const MIN_RAW_DOC_CHARS: usize = 50;

static DOCX_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("valid regex"));
static DOCX_TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:t(?: [^>]*)?>(.*?)</w:t>").expect("valid regex"));
static NON_PRINTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x20-\x7E\n\r\t]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Doc,
    Txt,
}

impl DocumentKind {
    /// Detects the kind from the original filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// Extracts text from the file at `path`, dispatching on `original_filename`.
pub fn extract_text(path: &Path, original_filename: &str) -> String {
    let text = match DocumentKind::from_filename(original_filename) {
        Some(DocumentKind::Pdf) => first_non_empty(path, &[pdf_via_pdf_extract, pdf_via_lopdf]),
        Some(DocumentKind::Docx) => first_non_empty(path, &[docx_text]),
        Some(DocumentKind::Doc) => first_non_empty(path, &[docx_text, doc_raw_utf8, doc_raw_latin1]),
        Some(DocumentKind::Txt) => first_non_empty(path, &[txt_utf8, txt_latin1]),
        None => {
            debug!(filename = original_filename, "Unsupported resume extension");
            None
        }
    };
    text.unwrap_or_default()
}

/// Spools `bytes` to a temporary file and runs [`extract_text`] on the blocking pool.
/// The temporary file is removed when extraction finishes.
pub async fn extract_text_from_bytes(bytes: Bytes, original_filename: String) -> String {
    tokio::task::spawn_blocking(move || {
        let suffix = Path::new(&original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut file = match tempfile::Builder::new()
            .prefix("resume-")
            .suffix(&suffix)
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not create temp file for extraction: {e}");
                return String::new();
            }
        };
        if let Err(e) = file.write_all(&bytes).and_then(|_| file.flush()) {
            warn!("Could not spool upload for extraction: {e}");
            return String::new();
        }
        extract_text(file.path(), &original_filename)
    })
    .await
    .unwrap_or_else(|e| {
        warn!("Text extraction task failed: {e}");
        String::new()
    })
}

type Strategy = fn(&Path) -> Option<String>;

fn first_non_empty(path: &Path, strategies: &[Strategy]) -> Option<String> {
    strategies
        .iter()
        .filter_map(|strategy| strategy(path))
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
}

fn pdf_via_pdf_extract(path: &Path) -> Option<String> {
    // pdf-extract panics on some malformed fonts; contain it to this strategy.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path))) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            debug!("pdf-extract failed: {e}");
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked, trying next strategy");
            None
        }
    }
}

fn pdf_via_lopdf(path: &Path) -> Option<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| debug!("lopdf could not load document: {e}"))
        .ok()?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut text = String::new();
    for page in pages {
        match doc.extract_text(&[page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => debug!(page, "lopdf page extraction failed: {e}"),
        }
    }
    Some(text)
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Reads `word/document.xml` from the OOXML container, one line per paragraph.
fn docx_text(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| debug!("Not a zip container: {e}"))
        .ok()?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .ok()?
        .read_to_string(&mut xml)
        .ok()?;

    let lines: Vec<String> = DOCX_PARAGRAPH
        .find_iter(&xml)
        .map(|paragraph| {
            DOCX_TEXT_RUN
                .captures_iter(paragraph.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .filter(|line| !line.trim().is_empty())
        .collect();
    Some(lines.join("\n"))
}

/// Keeps printable ASCII and collapses whitespace; used for legacy binary `.doc` files.
fn clean_binary_text(content: &str) -> Option<String> {
    let printable = NON_PRINTABLE.replace_all(content, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&printable, " ");
    let cleaned = collapsed.trim();
    (cleaned.chars().count() > MIN_RAW_DOC_CHARS).then(|| cleaned.to_string())
}

fn doc_raw_utf8(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    clean_binary_text(&String::from_utf8_lossy(&bytes))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn doc_raw_latin1(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    clean_binary_text(&latin1(&bytes))
}

fn txt_utf8(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    String::from_utf8(bytes).ok()
}

fn txt_latin1(path: &Path) -> Option<String> {
    std::fs::read(path).ok().map(|bytes| latin1(&bytes))
}
