//! End-to-end pipeline scenarios with mocked OCR and analysis services

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::document_parser::DocumentParser;
use super::testing::{MockAnalysisService, MockCall, MockOcr};
use super::*;
use crate::error::ValidationError;

fn pipeline(ocr: MockOcr, service: MockAnalysisService) -> (DocumentPipeline, Arc<MockOcr>, Arc<MockAnalysisService>) {
    let ocr = Arc::new(ocr);
    let service = Arc::new(service);
    let engine = TextExtractionEngine::new(Arc::new(DocumentParser::new()), Some(ocr.clone()));
    let orchestrator = AnalysisOrchestrator::new(service.clone(), service.clone());
    (DocumentPipeline::new(engine, orchestrator, true), ocr, service)
}

fn text_file(name: &str, len: usize) -> SourceFile {
    let sentence = "The supplier shall deliver goods within thirty days. ";
    let body: String = sentence.chars().cycle().take(len).collect();
    SourceFile::new(name, "text/plain", body.into_bytes())
}

/// A PDF with no text layer
fn scanned_pdf(name: &str) -> SourceFile {
    SourceFile::new(name, "application/pdf", b"%PDF-1.4\n%%EOF\n".to_vec())
}

#[tokio::test]
async fn test_native_and_ocr_files_end_done() {
    let (pipeline, ocr, _) = pipeline(
        MockOcr::new().with_pages("fileB.pdf", &["Scanned page one", "Scanned page two"]),
        MockAnalysisService::new(),
    );
    let mut events = pipeline.store().subscribe();

    let rejected = pipeline
        .ingest(vec![text_file("fileA.txt", 200), scanned_pdf("fileB.pdf")])
        .await
        .unwrap();
    assert!(rejected.is_empty());

    let cancel = CancellationToken::new();
    let failures = pipeline.extract_all(&cancel).await.unwrap();
    assert!(failures.is_empty());

    let results = pipeline.analyze(&cancel).await;
    assert_eq!(results.len(), 2);
    assert!(results.contains_key("fileA.txt"));
    assert!(results.contains_key("fileB.pdf"));

    let records = pipeline.store().snapshot().await.unwrap();
    assert!(records.iter().all(|r| r.status == FileStatus::Done));

    let a = &records[0];
    assert_eq!(a.extraction_result.as_ref().unwrap().source, ExtractionSource::Native);
    let b = &records[1];
    assert_eq!(b.extraction_result.as_ref().unwrap().source, ExtractionSource::Ocr);
    assert_eq!(b.extracted_text.as_deref(), Some("Scanned page one\nScanned page two"));

    assert_eq!(ocr.calls(), vec!["fileB.pdf".to_string()]);

    // fileA: start plus the single native 100; fileB: one step per OCR page
    let mut a_progress = Vec::new();
    let mut b_progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.status != FileStatus::Extracting {
            continue;
        }
        match event.name.as_str() {
            "fileA.txt" => a_progress.push(event.progress),
            "fileB.pdf" => b_progress.push(event.progress),
            _ => {}
        }
    }
    assert_eq!(a_progress, vec![Some(0), Some(100)]);
    assert_eq!(b_progress, vec![Some(0), Some(50), Some(100)]);
}

#[tokio::test]
async fn test_rejected_files_do_not_enter_the_batch() {
    let (pipeline, _, _) = pipeline(MockOcr::new(), MockAnalysisService::new());

    let huge = text_file("huge.txt", 16).with_declared_size(11 * 1024 * 1024);
    let zip = SourceFile::new("archive.zip", "application/zip", vec![0x50, 0x4B]);

    let rejected = pipeline
        .ingest(vec![huge, text_file("ok.txt", 80), zip])
        .await
        .unwrap();

    assert_eq!(rejected.len(), 2);
    assert!(matches!(rejected[0], ValidationError::TooLarge { .. }));
    assert!(matches!(rejected[1], ValidationError::UnsupportedType { .. }));
    assert_eq!(pipeline.store().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_extraction_still_analyzes_raw_file() {
    // No canned pages: OCR fails for the scan
    let (pipeline, _, service) = pipeline(MockOcr::new(), MockAnalysisService::new());
    pipeline.ingest(vec![scanned_pdf("scan.pdf")]).await.unwrap();

    let cancel = CancellationToken::new();
    let failures = pipeline.extract_all(&cancel).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file_name(), "scan.pdf");

    let record = pipeline.store().get(0).await.unwrap();
    assert_eq!(record.status, FileStatus::Error);
    assert!(record.extracted_text.is_none());
    assert!(record.progress.is_none());

    let results = pipeline.analyze(&cancel).await;
    assert!(results.contains_key("scan.pdf"));
    assert!(service.calls().iter().all(|c| matches!(
        c,
        MockCall::Clauses(AnalysisContent::File(_)) | MockCall::Risks(AnalysisContent::File(_))
    )));
}

#[tokio::test]
async fn test_edit_then_analyze_and_remove() {
    let (pipeline, _, service) = pipeline(MockOcr::new(), MockAnalysisService::new().fail_risks_for("Edited."));
    pipeline.ingest(vec![text_file("a.txt", 120)]).await.unwrap();

    let cancel = CancellationToken::new();
    pipeline.extract_all(&cancel).await.unwrap();
    pipeline.edit_text(0, "Edited.").await.unwrap();

    let results = pipeline.analyze(&cancel).await;
    let result = &results["a.txt"];
    assert!(result.degraded.risks);
    assert!(!result.degraded.clauses);
    assert_eq!(service.calls().len(), 2);

    let summary = format_summary("a.txt", result);
    assert!(summary.contains("Automatic renewal"));
    assert!(summary.contains("unavailable"));

    pipeline.remove(0).await.unwrap();
    assert!(pipeline.results().await.unwrap().is_empty());
    assert_eq!(pipeline.store().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ocr_disabled_fails_scanned_pdf() {
    let engine = TextExtractionEngine::new(Arc::new(DocumentParser::new()), Some(Arc::new(MockOcr::new())));
    let service = Arc::new(MockAnalysisService::new());
    let pipeline = DocumentPipeline::new(engine, AnalysisOrchestrator::new(service.clone(), service), false);

    pipeline.ingest(vec![scanned_pdf("scan.pdf")]).await.unwrap();
    let failures = pipeline.extract_all(&CancellationToken::new()).await.unwrap();

    assert!(matches!(failures[0], crate::error::ExtractionError::OcrDisabled { .. }));
}
