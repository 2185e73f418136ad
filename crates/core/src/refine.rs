//! Second pass that rewrites the merged summary into one coherent document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{
    error::{Result, VidsumError},
    pacing::{CallKind, Pacer},
    provider::SummaryService,
};

pub static REFINEMENT_PROMPT: &str = r#"The text below was produced by summarizing consecutive, slightly overlapping parts of one video and concatenating the results; parts are separated by "---".

Rewrite it as a single coherent Markdown document:
- Remove the repetition caused by the overlapping parts and drop the separators.
- Keep every distinct fact, example, and conclusion, in chronological order.
- Organize the content under descriptive headings with bullet points where helpful.
- Open with a short overview paragraph of the whole video.

Return only the rewritten document.

--- BEGIN MERGED SUMMARY ---
{summary}
--- END MERGED SUMMARY ---"#;

pub fn refinement_prompt(merged: &str) -> String {
    REFINEMENT_PROMPT.replace("{summary}", merged)
}

/// Refine the merged summary stored at `merged_path` into `refined_path`.
///
/// The merged text is read back from disk so a later run can refine output
/// from an earlier one. Returns `None` when there is no merged file; the
/// merged file is never modified.
pub async fn refine_merged_summary(
    service: &dyn SummaryService,
    pacer: &mut Pacer,
    merged_path: &Path,
    refined_path: &Path,
    timeout: std::time::Duration,
) -> Result<Option<PathBuf>> {
    if !fs::try_exists(merged_path).await.unwrap_or(false) {
        info!(path = %merged_path.display(), "no merged summary, skipping refinement");
        return Ok(None);
    }

    let merged = fs::read_to_string(merged_path)
        .await
        .map_err(|e| VidsumError::Refinement {
            reason: format!("cannot read {}: {}", merged_path.display(), e),
        })?;

    pacer.acquire(CallKind::Generate).await;
    let refined = service
        .complete(&refinement_prompt(&merged), timeout)
        .await
        .map_err(|e| VidsumError::Refinement {
            reason: e.to_string(),
        })?;

    fs::write(refined_path, &refined).await?;
    info!(path = %refined_path.display(), "refined summary written");

    Ok(Some(refined_path.to_path_buf()))
}
