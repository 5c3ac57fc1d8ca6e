//! One function per subcommand. Each returns a JSON document for stdout.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use taxonomy_core::preview::ImportPreview;
use taxonomy_core::store::TaxonomyStore;
use taxonomy_pipeline::maintenance::{import_status, parent_candidates, rebuild_tree, refresh_paths};
use taxonomy_pipeline::{decode, ImportOptions, TaxonomyImporter};

async fn read_document(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read import file: {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("failed to serialize command output")
}

/// Decode `path` and summarize it without touching the store.
pub async fn preview(path: &Path, actor_id: i64) -> anyhow::Result<Value> {
    let bytes = read_document(path).await?;
    let batch = decode(&bytes, actor_id)
        .with_context(|| format!("{} is not an importable document", path.display()))?;
    to_json(&ImportPreview::from_batch(&batch))
}

/// Import `path` into the store.
pub async fn import<S: TaxonomyStore + ?Sized>(
    store: &S,
    path: &Path,
    options: ImportOptions,
) -> anyhow::Result<Value> {
    let bytes = read_document(path).await?;
    let result = TaxonomyImporter::new(store, options).import_json(&bytes).await;
    to_json(&result)
}

/// Delete every tracked node and clear the ledger.
pub async fn reset<S: TaxonomyStore + ?Sized>(store: &S) -> anyhow::Result<Value> {
    let outcome = TaxonomyImporter::new(store, ImportOptions::default())
        .reset()
        .await;
    to_json(&outcome)
}

pub async fn rebuild<S: TaxonomyStore + ?Sized>(store: &S) -> anyhow::Result<Value> {
    to_json(&rebuild_tree(store).await)
}

pub async fn refresh<S: TaxonomyStore + ?Sized>(store: &S) -> anyhow::Result<Value> {
    let refresh = refresh_paths(store)
        .await
        .context("path refresh failed")?;
    to_json(&refresh)
}

pub async fn status<S: TaxonomyStore + ?Sized>(store: &S) -> anyhow::Result<Value> {
    let status = import_status(store)
        .await
        .context("failed to read import status")?;
    to_json(&status)
}

/// Parent picker entries, each with an indented label.
pub async fn parents<S: TaxonomyStore + ?Sized>(store: &S) -> anyhow::Result<Value> {
    let candidates = parent_candidates(store)
        .await
        .context("failed to list parent candidates")?;
    let listed: Vec<Value> = candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "title": c.title,
                "level": c.level,
                "label": c.label(),
            })
        })
        .collect();
    Ok(Value::Array(listed))
}
