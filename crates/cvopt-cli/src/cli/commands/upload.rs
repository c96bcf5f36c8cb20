use anyhow::{Context as _, Result};
use cvopt_core::client::UploadFile;
use cvopt_core::mime::normalize_input_path;
use cvopt_core::report;

use super::{Context, failure_error};

pub async fn run(ctx: &Context, file: &str) -> Result<()> {
    ctx.require_session()?;

    let path = normalize_input_path(file);
    let upload =
        UploadFile::from_path(&path).with_context(|| format!("load résumé {}", path.display()))?;
    tracing::info!(file = %upload.filename, mime = %upload.mime_type, "uploading résumé");

    let receipt = ctx
        .client
        .upload_resume(&upload)
        .await
        .map_err(|f| failure_error(&f))?;
    print!("{}", report::render_upload(&receipt));
    Ok(())
}
