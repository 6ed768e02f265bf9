//! lopdf-based per-page text extraction.

use std::path::Path;

use lopdf::Document as PdfDoc;
use quizsmith_common::Page;
use tracing::{debug, warn};

use crate::error::IngestionError;

/// Load a PDF file and return one [`Page`] per physical page, numbered from 1.
pub fn extract_pages(pdf_path: &Path) -> Result<Vec<Page>, IngestionError> {
    let pdf = PdfDoc::load(pdf_path).map_err(|source| IngestionError::Pdf {
        path: pdf_path.to_path_buf(),
        source,
    })?;
    let pages = pages_from_document(&pdf);
    debug!(path = %pdf_path.display(), pages = pages.len(), "Extracted PDF pages");
    Ok(pages)
}

/// Same as [`extract_pages`] for an in-memory PDF.
pub fn extract_pages_from_bytes(bytes: &[u8]) -> Result<Vec<Page>, IngestionError> {
    let pdf = PdfDoc::load_mem(bytes)?;
    Ok(pages_from_document(&pdf))
}

// A page whose text cannot be decoded stays in the sequence as an empty page so
// later page numbers still line up with the physical document.
fn pages_from_document(pdf: &PdfDoc) -> Vec<Page> {
    pdf.get_pages()
        .keys()
        .enumerate()
        .map(|(i, &page_num)| {
            let text = match pdf.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = page_num, error = %e, "Text extraction failed, keeping empty page");
                    String::new()
                }
            };
            Page::new(i as u32 + 1, text)
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_pdf::pdf_with_pages;
    use super::*;

    #[test]
    fn test_pages_are_numbered_from_one() {
        let bytes = pdf_with_pages(&["Chapter 1: Cells\nMembranes", "More on cells", "Chapter 2: Genetics"]);
        let pages = extract_pages_from_bytes(&bytes).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(pages[0].text.contains("Chapter 1: Cells"));
        assert!(pages[2].text.contains("Genetics"));
    }

    #[test]
    fn test_extract_pages_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, pdf_with_pages(&["Introduction", "Body"])).unwrap();
        let pages = extract_pages(&path).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = extract_pages_from_bytes(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, IngestionError::PdfBytes(_)));
    }
}
