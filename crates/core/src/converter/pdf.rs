//! Local PDF page operations on top of `lopdf`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use super::error::ConverterError;
use super::traits::Converter;
use crate::artifact::Artifact;
use crate::fileset::RawFile;

const PDF_MIME: &str = "application/pdf";

/// What a [`PdfConverter`] does with each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfOperation {
    /// Keep the inclusive 1-based page range.
    Split { start: u32, end: u32 },
    /// One single-page PDF per listed 1-based page.
    ExtractPages { pages: Vec<u32> },
    /// Rewrite with compressed streams.
    Compress,
}

/// In-process PDF converter.
pub struct PdfConverter {
    operation: PdfOperation,
}

impl PdfConverter {
    pub fn new(operation: PdfOperation) -> Self {
        Self { operation }
    }
}

#[async_trait]
impl Converter for PdfConverter {
    fn name(&self) -> &str {
        match self.operation {
            PdfOperation::Split { .. } => "pdf-split",
            PdfOperation::ExtractPages { .. } => "pdf-extract-pages",
            PdfOperation::Compress => "pdf-compress-local",
        }
    }

    fn is_local(&self, _target: &str) -> bool {
        true
    }

    async fn convert(&self, file: &RawFile, _target: &str) -> Result<Vec<Artifact>, ConverterError> {
        let file = file.clone();
        let operation = self.operation.clone();

        tokio::task::spawn_blocking(move || match operation {
            PdfOperation::Split { start, end } => split_pdf(&file, start, end).map(|a| vec![a]),
            PdfOperation::ExtractPages { pages } => extract_pages(&file, &pages),
            PdfOperation::Compress => compress_pdf(&file).map(|a| vec![a]),
        })
        .await?
    }
}

/// Number of pages in a PDF.
pub fn page_count(file: &RawFile) -> Result<u32, ConverterError> {
    Ok(load(file)?.get_pages().len() as u32)
}

/// Keeps pages `start..=end` (1-based, clamped to the document).
pub fn split_pdf(file: &RawFile, start: u32, end: u32) -> Result<Artifact, ConverterError> {
    let mut doc = load(file)?;
    let total = doc.get_pages().len() as u32;

    let first = start.max(1);
    let last = end.min(total);
    if total == 0 || first > last {
        return Err(ConverterError::InvalidPageRange { start, end, total });
    }

    let drop: Vec<u32> = (1..=total).filter(|p| *p < first || *p > last).collect();
    doc.delete_pages(&drop);
    doc.prune_objects();

    let name = format!("{}_pages_{}-{}.pdf", pdf_stem(file), start, end);
    debug!("Split {} to pages {}-{} of {}", file.name, first, last, total);
    Ok(Artifact::local(name, PDF_MIME, save(&mut doc)?))
}

/// Produces one single-page PDF per requested page, in request order.
/// Pages outside the document are skipped.
pub fn extract_pages(file: &RawFile, pages: &[u32]) -> Result<Vec<Artifact>, ConverterError> {
    let source = load(file)?;
    let total = source.get_pages().len() as u32;
    let stem = pdf_stem(file);

    let mut artifacts = Vec::new();
    for &page in pages.iter().filter(|p| **p >= 1 && **p <= total) {
        let mut doc = source.clone();
        let drop: Vec<u32> = (1..=total).filter(|p| *p != page).collect();
        doc.delete_pages(&drop);
        doc.prune_objects();
        artifacts.push(Artifact::local(
            format!("{}_page_{}.pdf", stem, page),
            PDF_MIME,
            save(&mut doc)?,
        ));
    }

    if artifacts.is_empty() {
        return Err(ConverterError::NoPagesSelected { total });
    }
    Ok(artifacts)
}

/// Rewrites the document with compressed streams and unused objects removed.
pub fn compress_pdf(file: &RawFile) -> Result<Artifact, ConverterError> {
    let mut doc = load(file)?;
    doc.prune_objects();
    doc.compress();
    let name = format!("{}_compressed.pdf", pdf_stem(file));
    Ok(Artifact::local(name, PDF_MIME, save(&mut doc)?))
}

/// Concatenates the pages of every input, in order, into `merged.pdf`.
pub fn merge_pdfs(files: &[RawFile]) -> Result<Artifact, ConverterError> {
    if files.is_empty() {
        return Err(ConverterError::pdf("nothing to merge"));
    }

    let mut max_id = 1;
    let mut pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for file in files {
        let mut doc = load(file)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc.get_object(page_id).map_err(ConverterError::pdf)?.to_owned();
            pages.insert(page_id, page);
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut pages_root: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects {
        let kind = type_name(&object);
        match kind.as_deref() {
            Some(b"Catalog") => {
                let id = catalog.as_ref().map_or(object_id, |(id, _)| *id);
                catalog = Some((id, object));
            }
            Some(b"Pages") => {
                if let Ok(dictionary) = object.as_dict() {
                    let mut dictionary = dictionary.clone();
                    if let Some((_, ref previous)) = pages_root {
                        if let Ok(previous) = previous.as_dict() {
                            dictionary.extend(previous);
                        }
                    }
                    let id = pages_root.as_ref().map_or(object_id, |(id, _)| *id);
                    pages_root = Some((id, Object::Dictionary(dictionary)));
                }
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_object) =
        pages_root.ok_or_else(|| ConverterError::pdf("no page tree found"))?;
    let (catalog_id, catalog_object) =
        catalog.ok_or_else(|| ConverterError::pdf("no document catalog found"))?;

    let page_count = pages.len();
    let mut kids = Vec::with_capacity(page_count);
    for (page_id, page) in pages {
        if let Ok(dictionary) = page.as_dict() {
            let mut dictionary = dictionary.clone();
            dictionary.set("Parent", pages_id);
            merged.objects.insert(page_id, Object::Dictionary(dictionary));
            kids.push(Object::Reference(page_id));
        }
    }

    let mut pages_dict = pages_object.as_dict().map_err(ConverterError::pdf)?.clone();
    pages_dict.set("Count", kids.len() as i64);
    pages_dict.set("Kids", kids);
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = catalog_object.as_dict().map_err(ConverterError::pdf)?.clone();
    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog_dict));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.adjust_zero_pages();
    merged.compress();

    debug!("Merged {} files into {} pages", files.len(), page_count);
    Ok(Artifact::local("merged.pdf", PDF_MIME, save(&mut merged)?))
}

fn type_name(object: &Object) -> Option<Vec<u8>> {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|name| name.as_name().ok())
        .map(|name| name.to_vec())
}

fn load(file: &RawFile) -> Result<Document, ConverterError> {
    Document::load_mem(&file.data).map_err(|e| ConverterError::decode(&file.name, e))
}

fn save(doc: &mut Document) -> Result<Vec<u8>, ConverterError> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(ConverterError::pdf)?;
    Ok(buf)
}

fn pdf_stem(file: &RawFile) -> &str {
    let name = file.name.as_str();
    match name.len().checked_sub(4) {
        Some(idx) if name.is_char_boundary(idx) && name[idx..].eq_ignore_ascii_case(".pdf") => {
            &name[..idx]
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn pdf(name: &str, pages: u32) -> RawFile {
        RawFile::new(name, PDF_MIME, fixtures::pdf_with_pages(pages))
    }

    fn pages_of(artifact: &Artifact) -> u32 {
        let data = artifact.bytes_in_memory().unwrap().clone();
        page_count(&RawFile::new("out.pdf", PDF_MIME, data)).unwrap()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&pdf("a.pdf", 5)).unwrap(), 5);
    }

    #[test]
    fn test_split_range() {
        let artifact = split_pdf(&pdf("Report.PDF", 6), 2, 4).unwrap();
        assert_eq!(artifact.suggested_filename(), "Report_pages_2-4.pdf");
        assert_eq!(pages_of(&artifact), 3);
    }

    #[test]
    fn test_split_clamps_end() {
        let artifact = split_pdf(&pdf("a.pdf", 3), 2, 10).unwrap();
        assert_eq!(pages_of(&artifact), 2);
    }

    #[test]
    fn test_split_empty_range_fails() {
        let err = split_pdf(&pdf("a.pdf", 3), 5, 6).unwrap_err();
        assert!(matches!(
            err,
            ConverterError::InvalidPageRange { start: 5, end: 6, total: 3 }
        ));
    }

    #[test]
    fn test_extract_skips_missing_pages() {
        let artifacts = extract_pages(&pdf("deck.pdf", 4), &[3, 9, 1]).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.suggested_filename()).collect();
        assert_eq!(names, vec!["deck_page_3.pdf", "deck_page_1.pdf"]);
        assert!(artifacts.iter().all(|a| pages_of(a) == 1));
    }

    #[test]
    fn test_extract_nothing_valid_fails() {
        let err = extract_pages(&pdf("a.pdf", 2), &[0, 7]).unwrap_err();
        assert!(matches!(err, ConverterError::NoPagesSelected { total: 2 }));
    }

    #[test]
    fn test_merge_concatenates_pages() {
        let merged = merge_pdfs(&[pdf("a.pdf", 2), pdf("b.pdf", 3)]).unwrap();
        assert_eq!(merged.suggested_filename(), "merged.pdf");
        assert_eq!(pages_of(&merged), 5);
    }

    #[test]
    fn test_merge_empty_fails() {
        assert!(merge_pdfs(&[]).is_err());
    }

    #[test]
    fn test_compress_keeps_pages() {
        let artifact = compress_pdf(&pdf("big.pdf", 3)).unwrap();
        assert_eq!(artifact.suggested_filename(), "big_compressed.pdf");
        assert_eq!(pages_of(&artifact), 3);
    }

    #[test]
    fn test_invalid_pdf_is_decode_error() {
        let broken = RawFile::new("broken.pdf", PDF_MIME, b"%PDF-nonsense".to_vec());
        assert!(matches!(
            split_pdf(&broken, 1, 1),
            Err(ConverterError::Decode { .. })
        ));
    }
}
