//! Verbatim HTML dumps for offline inspection of the source page.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// File name for a page dump: timestamp plus a content hash prefix.
pub fn dump_file_name(html: &str) -> String {
    let digest = Sha256::digest(html.as_bytes());
    format!(
        "page-{}-{}.html",
        Utc::now().format("%Y%m%dT%H%M%SZ"),
        &hex::encode(digest)[..12]
    )
}

/// Write `html` into `dir`, returning the file path.
pub async fn dump_html(dir: &Path, html: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(dump_file_name(html));

    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(html.as_bytes()).await?;
    file.flush().await?;
    Ok(path)
}
