use crate::services::photos;
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path, page: usize) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;
    db.migrate()?;

    let per_page = config.images.per_page;
    let page = page.max(1);
    let total = photos::count_published(&db)?;
    let items = photos::list_published(&db, per_page, (page - 1) * per_page)?;

    println!(
        "{:<7} {:<12} {:<20} {:<6} {:<6} COMMENT",
        "ID", "TYPE", "CREATED", "THUMB", "RESIZE"
    );
    println!("{}", "-".repeat(72));
    for photo in &items {
        println!(
            "{:<7} {:<12} {:<20} {:<6} {:<6} {}",
            photo.id,
            photo.mime_type,
            photo.created_at.format("%Y-%m-%d %H:%M:%S"),
            if photo.thumbnail.is_computed() { "yes" } else { "no" },
            if photo.resized.is_computed() { "yes" } else { "no" },
            photo.comment
        );
    }
    println!(
        "page {} of {} ({} published)",
        page,
        (total as usize).div_ceil(per_page).max(1),
        total
    );

    Ok(())
}
