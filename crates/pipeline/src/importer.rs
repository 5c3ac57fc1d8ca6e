//! Import orchestration.
//!
//! Decoding and committing are separate steps: [`decode`] turns bytes into an
//! [`EntryBatch`] and [`TaxonomyImporter::commit`] writes it. The batch is
//! passed explicitly so callers can preview it in between.
//!
//! Commit flow per batch: order entries, then for each entry resolve the
//! parent, insert the node and record it in the ledger. The rebuild engine
//! runs once at the end if anything was inserted. There is no batch-wide
//! transaction; every insert that succeeded stays committed even if later
//! entries fail.

use taxonomy_core::entry::{DecodeContext, DecodeError, EntryBatch};
use taxonomy_core::hierarchy::order_by_hierarchy;
use taxonomy_core::outcome::{ImportIssue, ImportResult, ResetOutcome};
use taxonomy_core::store::{StoreError, TaxonomyStore};
use taxonomy_core::types::{DbId, ROOT_ID};

use crate::ledger::TrackingLedger;
use crate::rebuild::RebuildEngine;
use crate::resolver::{ParentPrecedence, ParentResolver};
use crate::writer::NestedSetWriter;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-batch settings.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Parent for entries without a usable parent reference.
    pub default_parent_id: DbId,
    pub precedence: ParentPrecedence,
    /// Run the rebuild engine after a batch that inserted anything.
    pub rebuild_after_import: bool,
    /// User recorded as creator and importer.
    pub actor_id: DbId,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            default_parent_id: ROOT_ID,
            precedence: ParentPrecedence::default(),
            rebuild_after_import: true,
            actor_id: 0,
        }
    }
}

/// Decode raw JSON bytes into a batch, stamping audit defaults with `actor_id`
/// and the current time.
pub fn decode(bytes: &[u8], actor_id: DbId) -> Result<EntryBatch, DecodeError> {
    EntryBatch::from_slice(bytes, &DecodeContext::new(actor_id))
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

pub struct TaxonomyImporter<'a, S: TaxonomyStore + ?Sized> {
    store: &'a S,
    options: ImportOptions,
}

impl<'a, S: TaxonomyStore + ?Sized> TaxonomyImporter<'a, S> {
    pub fn new(store: &'a S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Decode and commit in one step. A document that cannot be decoded
    /// yields a failed result without touching the store.
    pub async fn import_json(&self, bytes: &[u8]) -> ImportResult {
        match decode(bytes, self.options.actor_id) {
            Ok(batch) => self.commit(batch).await,
            Err(e) => {
                tracing::warn!(error = %e, "Import document rejected");
                let message = match e {
                    DecodeError::InvalidStructure(message) => message,
                    DecodeError::InvalidJson(json) => format!("not valid JSON ({json})"),
                };
                ImportResult::aborted(ImportIssue::InvalidStructure(message))
            }
        }
    }

    /// Write every entry of `batch`.
    pub async fn commit(&self, batch: EntryBatch) -> ImportResult {
        let mut result = ImportResult::started();
        let total = batch.source_len();
        tracing::info!(
            entries = batch.entries.len(),
            rejected = batch.rejected.len(),
            default_parent_id = self.options.default_parent_id,
            precedence = %self.options.precedence,
            "Starting taxonomy import",
        );

        for warning in batch.warnings {
            result.warn(warning);
        }
        for rejected in batch.rejected {
            result.record_issue(ImportIssue::InvalidEntry {
                index: rejected.index,
                reason: rejected.reason,
            });
        }

        let (resolver, default_warning) = ParentResolver::for_batch(
            self.store,
            self.options.default_parent_id,
            self.options.precedence,
        )
        .await;
        if let Some(warning) = default_warning {
            result.warn(warning);
        }

        let order = order_by_hierarchy(batch.entries);
        if !order.unresolved.is_empty() {
            tracing::debug!(
                unresolved = ?order.unresolved,
                passes = order.passes,
                "Some parent aliases are not defined earlier in the batch",
            );
        }

        let writer = NestedSetWriter::new();
        let mut ledger = TrackingLedger::new(self.store);

        for entry in order.entries {
            let parent = resolver.resolve(self.store, &entry).await;
            if !parent.notes.is_empty() {
                result.record_issue(ImportIssue::ParentUnresolvable {
                    index: entry.index,
                    alias: entry.alias.clone(),
                    detail: parent.notes.join("; "),
                    fallback: parent.id,
                });
            }

            let written = match writer.write(self.store, &entry, parent.id).await {
                Ok(written) => written,
                Err(issue) => {
                    tracing::warn!(
                        index = entry.index,
                        alias = %entry.alias,
                        %issue,
                        "Entry skipped",
                    );
                    result.record_issue(issue);
                    continue;
                }
            };

            tracing::info!(
                id = written.id,
                alias = %entry.alias,
                parent_id = written.parent_id,
                level = written.level,
                "Node created",
            );
            result.record_created(written.id);
            for warning in written.warnings {
                result.warn(warning);
            }

            let recorded = ledger
                .record(
                    written.id,
                    &entry.alias,
                    self.options.actor_id,
                    chrono::Utc::now(),
                    &entry.source,
                )
                .await;
            if let Err(e) = recorded {
                result.record_issue(ImportIssue::TrackingWriteFailed {
                    node_id: written.id,
                    detail: e.to_string(),
                });
            }
        }

        if result.imported > 0 && self.options.rebuild_after_import {
            let report = RebuildEngine::new(ROOT_ID).run(self.store).await;
            for warning in report.warnings {
                result.record_issue(ImportIssue::RebuildFailed(warning));
            }
        }

        tracing::info!(
            total,
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Taxonomy import finished",
        );
        result
    }

    /// Remove every node recorded in the ledger and clear it.
    ///
    /// When anything was deleted the rebuild engine runs afterwards, which
    /// closes the gaps and re-attaches surviving children of deleted nodes
    /// to the root.
    pub async fn reset(&self) -> ResetOutcome {
        let ledger = TrackingLedger::new(self.store);
        let counts = match ledger.reset().await {
            Ok(counts) => counts,
            Err(StoreError::TrackingUnavailable) => {
                tracing::warn!("Reset requested but the tracking table does not exist");
                return ResetOutcome::failed(ImportIssue::TrackingUnavailable);
            }
            Err(e) => {
                tracing::error!(error = %e, "Reset failed");
                return ResetOutcome::failed(ImportIssue::ResetFailed(e.to_string()));
            }
        };

        let mut outcome = ResetOutcome::completed(counts.deleted, counts.cleared);
        if counts.deleted > 0 {
            let report = RebuildEngine::new(ROOT_ID).run(self.store).await;
            outcome.warnings.extend(
                report
                    .warnings
                    .into_iter()
                    .map(|w| ImportIssue::RebuildFailed(w).to_string()),
            );
        }
        outcome
    }
}
