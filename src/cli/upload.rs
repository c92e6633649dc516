use crate::models::NewPhoto;
use crate::services::library::PhotoLibrary;
use crate::{Config, Database};
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(
    config_path: &Path,
    file: &Path,
    comment: String,
    mime: Option<String>,
    unpublished: bool,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;
    db.migrate()?;

    let data = std::fs::read(file).with_context(|| format!("Could not read {}", file.display()))?;
    let mime_type = mime.unwrap_or_else(|| detect_mime(file, &data));

    let library = PhotoLibrary::from_config(&config, db);
    let photo = library.upload(
        NewPhoto {
            mime_type,
            comment,
            created_at: None,
            published: Some(!unpublished),
        },
        &data,
    )?;

    tracing::info!("Stored original as {}", photo.key());
    println!("{}", photo.id);

    Ok(())
}

/// Content sniffing first, then the file extension.
pub fn detect_mime(file: &Path, data: &[u8]) -> String {
    match infer::get(data) {
        Some(kind) => kind.mime_type().to_string(),
        None => mime_guess::from_path(file)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
