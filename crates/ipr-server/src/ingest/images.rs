//! Report image ingestion
//!
//! Image entries name files on disk; the bytes are stored with the report as
//! database blobs. File reads and checksums run concurrently since they never
//! touch the transaction connection; the rows themselves are written through
//! the caller's transaction so a failed ingestion leaves no blobs behind.

use std::path::Path;

use futures::future::try_join_all;
use ipr_common::checksum::sha256_hex;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::models::ImageInput;
use super::orchestrator::CreateReportError;

/// Cap on the summed size of a report's stored image blobs.
pub const IMAGE_UPLOAD_LIMIT_BYTES: i64 = 50_000_000;

/// An image file read into memory and ready to persist.
#[derive(Debug)]
pub struct LoadedImage {
    pub key: String,
    pub filename: String,
    pub format: String,
    pub checksum: String,
    pub data: Vec<u8>,
    pub caption: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
}

/// Image format inferred from the file extension.
fn image_format(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn load_image(input: &ImageInput) -> Result<LoadedImage, CreateReportError> {
    let data = tokio::fs::read(&input.path)
        .await
        .map_err(|source| CreateReportError::Image {
            key: input.key.clone(),
            source,
        })?;

    let filename = Path::new(&input.path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.path.clone());

    Ok(LoadedImage {
        key: input.key.clone(),
        filename,
        format: image_format(&input.path),
        checksum: sha256_hex(&data),
        data,
        caption: input.caption.clone(),
        title: input.title.clone(),
        category: input.category.clone(),
    })
}

/// Read every image file concurrently. Any unreadable file fails the whole
/// batch before a single row is written.
pub async fn load_images(images: &[ImageInput]) -> Result<Vec<LoadedImage>, CreateReportError> {
    try_join_all(images.iter().map(load_image)).await
}

/// Persist the loaded images under the caller's transaction.
pub async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    images: &[LoadedImage],
) -> Result<(), CreateReportError> {
    if images.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO report_image_data (report_id, key, filename, data, format, checksum, \
         caption, title, category) ",
    );
    qb.push_values(images, |mut b, image| {
        b.push_bind(report_id)
            .push_bind(&image.key)
            .push_bind(&image.filename)
            .push_bind(&image.data)
            .push_bind(&image.format)
            .push_bind(&image.checksum)
            .push_bind(&image.caption)
            .push_bind(&image.title)
            .push_bind(&image.category);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(|source| CreateReportError::Section {
            section: "images",
            source,
        })?;

    Ok(())
}

/// Total size of the blobs stored for a report, read within the transaction.
pub async fn total_image_bytes(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
) -> Result<i64, CreateReportError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(OCTET_LENGTH(data)), 0)::BIGINT \
         FROM report_image_data WHERE report_id = $1",
    )
    .bind(report_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_format_from_extension() {
        assert_eq!(image_format("/data/plots/cnv.PNG"), "png");
        assert_eq!(image_format("/data/plots/expr.svg"), "svg");
        assert_eq!(image_format("/data/plots/no_extension"), "unknown");
    }

    #[tokio::test]
    async fn test_load_image_reads_file_and_checksums() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"not really a png").unwrap();

        let input = ImageInput {
            path: file.path().to_string_lossy().into_owned(),
            key: "cnv.circos".to_string(),
            caption: Some("CNV circos plot".to_string()),
            title: None,
            category: None,
        };

        let loaded = load_image(&input).await.unwrap();
        assert_eq!(loaded.key, "cnv.circos");
        assert_eq!(loaded.format, "png");
        assert_eq!(loaded.data, b"not really a png");
        assert_eq!(loaded.checksum, sha256_hex(b"not really a png"));
        assert!(loaded.filename.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_load_image_missing_file_names_key() {
        let input = ImageInput {
            path: "/nonexistent/path/image.png".to_string(),
            key: "missing".to_string(),
            caption: None,
            title: None,
            category: None,
        };

        match load_images(std::slice::from_ref(&input)).await {
            Err(CreateReportError::Image { key, .. }) => assert_eq!(key, "missing"),
            other => panic!("expected image error, got {:?}", other.map(|v| v.len())),
        }
    }
}
