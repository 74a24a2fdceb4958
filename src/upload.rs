use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use image::ImageFormat;
use tracing::debug;
use uuid::Uuid;

use crate::error::LookupError;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";
const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A validated upload that has been written to the upload directory.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-supplied name, used verbatim as the lookup key.
    pub original_filename: String,
    pub format: ImageFormat,
    pub storage_name: String,
    pub storage_path: PathBuf,
}

/// Random hex token for stored file names.
pub fn unique_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Image format for `filename`, judged only by the text after its last dot.
pub fn allowed_format(filename: &str) -> Option<ImageFormat> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    ImageFormat::from_extension(&ext)
}

fn is_safe_filename(filename: &str) -> bool {
    !(filename == "." || filename == ".." || filename.contains(['/', '\\', '\0']))
}

/// Checks the client filename without touching the disk.
pub fn validate(filename: Option<&str>) -> Result<(String, ImageFormat), LookupError> {
    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return Err(LookupError::MissingUpload),
    };
    let format = allowed_format(filename).ok_or(LookupError::InvalidFileType)?;
    if !is_safe_filename(filename) {
        return Err(LookupError::InvalidFileName);
    }
    Ok((filename.to_string(), format))
}

/// Pulls the image field out of the form, validates it and stores it as
/// `<hex>_<original filename>` under `upload_dir`. Nothing is written when
/// validation fails.
pub async fn receive(
    mut multipart: Multipart,
    upload_dir: &Path,
) -> Result<UploadedImage, LookupError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let (original_filename, format) = validate(field.file_name())?;
        let data = field.bytes().await?;

        let storage_name = format!("{}_{}", unique_token(), original_filename);
        let storage_path = upload_dir.join(&storage_name);
        tokio::fs::write(&storage_path, &data).await?;
        debug!(
            "stored upload {} ({:?}, {} bytes) as {}",
            original_filename,
            format,
            data.len(),
            storage_path.display()
        );

        return Ok(UploadedImage {
            original_filename,
            format,
            storage_name,
            storage_path,
        });
    }

    Err(LookupError::MissingUpload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_png_and_jpeg_any_case() {
        assert_eq!(allowed_format("leaf.png"), Some(ImageFormat::Png));
        assert_eq!(allowed_format("leaf.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(allowed_format("leaf.old.jpeg"), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn rejects_other_extensions() {
        assert_eq!(allowed_format("leaf.gif"), None);
        assert_eq!(allowed_format("notes.txt"), None);
        assert_eq!(allowed_format("leaf.png.exe"), None);
        assert_eq!(allowed_format("png"), None);
        assert_eq!(allowed_format("leaf."), None);
    }

    #[test]
    fn validate_reports_missing_then_type_then_name() {
        assert!(matches!(validate(None), Err(LookupError::MissingUpload)));
        assert!(matches!(validate(Some("")), Err(LookupError::MissingUpload)));
        assert!(matches!(
            validate(Some("leaf.gif")),
            Err(LookupError::InvalidFileType)
        ));
        assert!(matches!(
            validate(Some("../escape.png")),
            Err(LookupError::InvalidFileName)
        ));
        assert!(matches!(
            validate(Some("dir\\leaf.png")),
            Err(LookupError::InvalidFileName)
        ));

        let (name, format) = validate(Some("leaf001.jpg")).unwrap();
        assert_eq!(name, "leaf001.jpg");
        assert_eq!(format, ImageFormat::Jpeg);
    }

    #[test]
    fn tokens_are_hex_and_unique() {
        let a = unique_token();
        let b = unique_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
