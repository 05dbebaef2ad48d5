//! Paginated PDF documents

use async_trait::async_trait;
use lopdf::Document;

use crate::error::{Error, Result};
use crate::types::{keys, ContentType, FileRecord, Metadata, NormalizedDocument};

use super::Normalizer;

/// One document per PDF page, in page order
#[derive(Debug, Default)]
pub struct PdfNormalizer;

impl PdfNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Extract the text of every page; any unreadable page fails the file
    fn extract_pages(record: &FileRecord) -> Result<Vec<(u32, String)>> {
        let doc = Document::load(&record.path).map_err(|e| {
            Error::normalization(&record.filename, format!("Failed to load PDF: {}", e))
        })?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(Error::normalization(&record.filename, "PDF has no pages"));
        }

        pages
            .keys()
            .map(|&page_num| {
                doc.extract_text(&[page_num])
                    .map(|text| (page_num, text))
                    .map_err(|e| {
                        Error::normalization(
                            &record.filename,
                            format!("Failed to extract page {}: {}", page_num, e),
                        )
                    })
            })
            .collect()
    }
}

#[async_trait]
impl Normalizer for PdfNormalizer {
    async fn normalize(
        &self,
        record: &FileRecord,
        metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        let owned = record.clone();
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(&owned))
            .await
            .map_err(|e| Error::internal(format!("PDF extraction task failed: {}", e)))??;

        tracing::debug!("Extracted {} pages from {}", pages.len(), record.filename);

        Ok(pages
            .into_iter()
            .map(|(page, text)| {
                let page_meta = metadata
                    .clone()
                    .with(keys::PAGE, page)
                    .with(keys::CONTENT_TYPE, ContentType::Document.as_str());
                NormalizedDocument::new(text, page_meta)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::MetadataBuilder;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn write_pdf(path: &std::path::Path, pages: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_one_document_per_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.pdf");
        write_pdf(&path, &["Welcome aboard", "Safety rules"]);

        let record = MetadataBuilder::new(dir.path()).build(&path).await.unwrap();
        let docs = PdfNormalizer::new()
            .normalize(&record, &record.metadata())
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].text.contains("Welcome aboard"));
        assert!(docs[1].text.contains("Safety rules"));
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(
                doc.metadata.get(keys::PAGE),
                Some(&crate::types::MetadataValue::Integer(i as i64 + 1))
            );
            assert_eq!(doc.metadata.get_str(keys::CONTENT_TYPE), Some("document"));
            assert_eq!(doc.metadata.get_str(keys::FILENAME), Some("guide.pdf"));
        }
    }

    #[tokio::test]
    async fn test_corrupt_pdf_fails_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

        let record = MetadataBuilder::new(dir.path()).build(&path).await.unwrap();
        let err = PdfNormalizer::new()
            .normalize(&record, &record.metadata())
            .await
            .unwrap_err();

        match err {
            Error::Normalization { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
