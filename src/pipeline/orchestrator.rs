//! Batch analysis orchestrator
//!
//! Walks the batch in acceptance order, one file at a time. For each file it
//! picks the content to send, runs the clause and risk calls together and
//! stores the merged result under the file's name. A failed call degrades to an
//! empty list; anything else that goes wrong marks the file as failed and the
//! batch moves on.

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::encoder::encode;
use super::record::{FileRecord, FileStatus};
use super::services::{AnalysisContent, ClauseExtractor, RiskAssessor};
use super::store::BatchHandle;
use super::types::{AnalysisResult, Degraded};
use crate::error::OrchestrationError;

/// Pick the single representation of a file to analyze:
/// edited text, then extracted text, then the encoded raw file.
pub fn resolve_content(record: &FileRecord) -> Result<AnalysisContent, OrchestrationError> {
    if let Some(ref text) = record.edited_text {
        return Ok(AnalysisContent::text(text.clone()));
    }
    if let Some(ref text) = record.extracted_text {
        return Ok(AnalysisContent::text(text.clone()));
    }
    if record.file.bytes.is_empty() {
        return Err(OrchestrationError::EmptyContent {
            name: record.name().to_string(),
        });
    }
    Ok(AnalysisContent::File(encode(&record.file)))
}

pub struct AnalysisOrchestrator {
    clauses: Arc<dyn ClauseExtractor>,
    risks: Arc<dyn RiskAssessor>,
}

impl AnalysisOrchestrator {
    pub fn new(clauses: Arc<dyn ClauseExtractor>, risks: Arc<dyn RiskAssessor>) -> Self {
        Self { clauses, risks }
    }

    /// Run both analysis calls for one piece of content.
    ///
    /// Each call is wrapped on its own: a failure yields an empty list and sets
    /// the matching `degraded` flag. Only cancellation fails the whole file.
    pub async fn analyze_content(
        &self,
        name: &str,
        content: &AnalysisContent,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, OrchestrationError> {
        let clause_call = async {
            match self.clauses.extract_clauses(content).await {
                Ok(clauses) => (clauses, false),
                Err(e) => {
                    tracing::warn!("[Orchestrator] Clause extraction failed for {}: {}", name, e);
                    (Vec::new(), true)
                }
            }
        };
        let risk_call = async {
            match self.risks.assess_risks(content).await {
                Ok(risks) => (risks, false),
                Err(e) => {
                    tracing::warn!("[Orchestrator] Risk assessment failed for {}: {}", name, e);
                    (Vec::new(), true)
                }
            }
        };

        let ((clauses, clauses_degraded), (risks, risks_degraded)) = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(OrchestrationError::Cancelled { name: name.to_string() });
            }
            pair = futures::future::join(clause_call, risk_call) => pair,
        };

        Ok(AnalysisResult {
            clauses,
            risks,
            degraded: Degraded {
                clauses: clauses_degraded,
                risks: risks_degraded,
            },
        })
    }

    async fn analyze_record(
        &self,
        store: &BatchHandle,
        index: usize,
        record: &FileRecord,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, OrchestrationError> {
        let name = record.name().to_string();
        let content = resolve_content(record)?;

        store.update(index, FileRecord::begin_upload).await?;
        tracing::info!("[Orchestrator] Analyzing {} ({} content)", name, content.kind());

        let result = self.analyze_content(&name, &content, cancel).await?;

        // Stored before the record reports done
        store.set_result(name.as_str(), result.clone()).await?;
        store.update(index, FileRecord::complete_analysis).await?;

        Ok(result)
    }

    /// Analyze every record in the store, sequentially.
    ///
    /// Returns the results produced by this run, keyed by file name. Files that
    /// fail are marked `error`, left out, and lose any earlier stored result. Records still extracting are
    /// skipped. Cancellation stops the loop; the file in flight is marked
    /// `error`.
    pub async fn analyze_batch(
        &self,
        store: &BatchHandle,
        cancel: &CancellationToken,
    ) -> HashMap<String, AnalysisResult> {
        let mut results = HashMap::new();

        let count = match store.len().await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("[Orchestrator] Cannot read batch: {}", e);
                return results;
            }
        };

        for index in 0..count {
            if cancel.is_cancelled() {
                tracing::info!("[Orchestrator] Cancelled, {} file(s) not analyzed", count - index);
                break;
            }

            // Fresh read so late edits are picked up
            let record = match store.get(index).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("[Orchestrator] Record #{} unavailable: {}", index, e);
                    continue;
                }
            };

            if record.status == FileStatus::Extracting {
                tracing::warn!("[Orchestrator] Skipping {}: extraction still running", record.name());
                continue;
            }

            match self.analyze_record(store, index, &record, cancel).await {
                Ok(result) => {
                    results.insert(record.name().to_string(), result);
                }
                Err(e) => {
                    let cancelled = matches!(e, OrchestrationError::Cancelled { .. });
                    let reason = if cancelled { "cancelled".to_string() } else { e.to_string() };

                    tracing::error!("[Orchestrator] Analysis FAILED for {}: {}", record.name(), e);
                    // A result from an earlier run must not outlive the failure
                    if let Err(store_err) = store.clear_result(index).await {
                        tracing::warn!(
                            "[Orchestrator] Could not clear result for {}: {}",
                            record.name(),
                            store_err
                        );
                    }
                    if let Err(store_err) = store.update(index, move |r| r.fail_analysis(reason)).await {
                        tracing::warn!(
                            "[Orchestrator] Could not mark {} as failed: {}",
                            record.name(),
                            store_err
                        );
                    }

                    if cancelled {
                        break;
                    }
                }
            }
        }

        tracing::info!("[Orchestrator] Batch done: {}/{} analyzed", results.len(), count);
        results
    }
}
