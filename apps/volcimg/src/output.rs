//! Saving and printing gallery entries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};
use volcimg_client::{DecodeFormat, DecodeState, Gallery, RenderedImage, ResolvedAs, VolcImageClient};

/// File name for the `position`-th image (1-based) of a run started at `stamp_millis`.
pub fn file_name(stamp_millis: i64, position: usize, extension: &str) -> String {
    format!("volcimg_{stamp_millis}_{position}.{extension}")
}

/// Where an entry ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Written to this path.
    Saved(PathBuf),
    /// Broken entries are never written.
    Placeholder,
    /// Saving was turned off.
    NotSaved,
    /// Writing or downloading failed.
    Failed(String),
}

/// Write every downloadable entry into `dir`.
///
/// Base64 entries are written from their decoded bytes; URL entries are
/// downloaded with the same client first. A failure on one entry does not
/// stop the others.
pub async fn save_gallery(
    client: &VolcImageClient,
    gallery: &Gallery,
    dir: &Path,
    stamp_millis: i64,
) -> Result<Vec<SaveStatus>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;

    let mut statuses = Vec::with_capacity(gallery.entries().len());
    for entry in gallery.entries() {
        let status = match save_entry(client, entry, dir, stamp_millis).await {
            Ok(status) => status,
            Err(e) => {
                error!(index = entry.index(), error = %format!("{e:#}"), "Failed to save image");
                SaveStatus::Failed(format!("{e:#}"))
            }
        };
        statuses.push(status);
    }
    Ok(statuses)
}

async fn save_entry(
    client: &VolcImageClient,
    entry: &RenderedImage,
    dir: &Path,
    stamp_millis: i64,
) -> Result<SaveStatus> {
    let Some(extension) = entry.file_extension() else {
        return Ok(SaveStatus::Placeholder);
    };

    let bytes = match (entry.state(), entry.bytes()) {
        (DecodeState::Resolved(ResolvedAs::Remote), _) => client
            .fetch_image(entry.descriptor().payload())
            .await
            .with_context(|| format!("cannot download {}", entry.descriptor().payload()))?,
        (_, Some(bytes)) => bytes.to_vec(),
        (_, None) => return Ok(SaveStatus::Placeholder),
    };

    let path = dir.join(file_name(stamp_millis, entry.index() + 1, extension));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved image");
    Ok(SaveStatus::Saved(path))
}

/// One gallery line: position, alt text, state and where the image went.
pub fn describe(entry: &RenderedImage, status: &SaveStatus) -> String {
    let state = match entry.state() {
        DecodeState::Resolved(ResolvedAs::Decoded(DecodeFormat::Jpeg)) => "jpeg",
        DecodeState::Resolved(ResolvedAs::Decoded(DecodeFormat::Png)) => "png",
        DecodeState::Resolved(ResolvedAs::Remote) => "remote",
        DecodeState::Broken => "broken",
        DecodeState::Unresolved | DecodeState::JpegAttempted | DecodeState::PngAttempted => {
            "pending"
        }
    };
    let target = match status {
        SaveStatus::Saved(path) => path.display().to_string(),
        SaveStatus::Placeholder => "placeholder".to_owned(),
        SaveStatus::NotSaved => match entry.state() {
            DecodeState::Resolved(ResolvedAs::Remote) => entry.descriptor().payload().to_owned(),
            _ => "not saved".to_owned(),
        },
        SaveStatus::Failed(message) => format!("save failed: {message}"),
    };
    format!(
        "[{}] {} | {state} | {target}",
        entry.index() + 1,
        entry.display_alt()
    )
}

#[cfg(test)]
mod tests {
    use volcimg_client::ImageCrateDecoder;
    use volcimg_core::VolcConfig;
    use volcimg_model::{ImageDescriptor, ImageEncoding};

    use super::*;

    const PNG_1X1: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn client() -> VolcImageClient {
        VolcImageClient::new(VolcConfig {
            access_key_id: "AKTEST".to_owned(),
            secret_key: "testsecret".to_owned(),
            ..VolcConfig::default()
        })
        .unwrap()
    }

    fn gallery(payloads: &[&str]) -> Gallery {
        let mut gallery = Gallery::new();
        gallery.show(
            payloads
                .iter()
                .map(|p| ImageDescriptor::new(ImageEncoding::Base64, p, "a red fox").unwrap())
                .collect(),
            &ImageCrateDecoder,
        );
        gallery
    }

    #[test]
    fn test_should_format_file_names() {
        assert_eq!(file_name(1_715_308_243_000, 2, "png"), "volcimg_1715308243000_2.png");
    }

    #[tokio::test]
    async fn test_should_save_resolved_and_skip_broken_entries() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(&[PNG_1X1, "Z2FyYmFnZQ=="]);

        let statuses = save_gallery(&client(), &gallery, dir.path(), 42).await.unwrap();

        let expected = dir.path().join("volcimg_42_1.png");
        assert_eq!(statuses, [SaveStatus::Saved(expected.clone()), SaveStatus::Placeholder]);
        assert!(expected.exists());
        assert!(!dir.path().join("volcimg_42_2.jpg").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_should_describe_entries() {
        let gallery = gallery(&[PNG_1X1, "Z2FyYmFnZQ=="]);
        let entries = gallery.entries();

        assert_eq!(
            describe(&entries[0], &SaveStatus::NotSaved),
            "[1] a red fox | png | not saved"
        );
        assert_eq!(
            describe(&entries[1], &SaveStatus::Placeholder),
            "[2] a red fox (failed to load) | broken | placeholder"
        );
    }
}
