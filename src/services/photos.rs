use crate::models::{Photo, Variant, VariantState};
use crate::Database;
use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

const PHOTO_COLUMNS: &str = "id, mime_type, comment, created_at, thumbnail, resized, published";

/// Whether any stored photo already uses `id`.
pub fn photo_exists(db: &Database, id: &str) -> Result<bool> {
    let conn = db.get()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos WHERE id = ?", [id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

pub fn insert_photo(db: &Database, photo: &Photo) -> Result<()> {
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO photos (id, mime_type, comment, created_at, thumbnail, resized, published)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            photo.id,
            photo.mime_type,
            photo.comment,
            photo.created_at,
            photo.thumbnail.is_computed(),
            photo.resized.is_computed(),
            photo.published,
        ],
    )?;
    Ok(())
}

pub fn get_photo_by_id(db: &Database, id: &str) -> Result<Option<Photo>> {
    let conn = db.get()?;
    let photo = conn
        .query_row(
            &format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS),
            [id],
            row_to_photo,
        )
        .optional()?;
    Ok(photo)
}

/// Persists that a variant has been derived. Flags only ever go from 0 to 1.
pub fn mark_variant_computed(db: &Database, id: &str, variant: Variant) -> Result<()> {
    let column = match variant {
        Variant::Thumbnail => "thumbnail",
        Variant::Resized => "resized",
    };
    let conn = db.get()?;
    conn.execute(
        &format!("UPDATE photos SET {} = 1 WHERE id = ?", column),
        [id],
    )?;
    Ok(())
}

pub fn count_published(db: &Database) -> Result<i64> {
    let conn = db.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM photos WHERE published = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Published photos, newest first.
pub fn list_published(db: &Database, limit: usize, offset: usize) -> Result<Vec<Photo>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM photos WHERE published = 1 ORDER BY created_at DESC LIMIT ? OFFSET ?",
        PHOTO_COLUMNS
    ))?;
    let photos = stmt
        .query_map((limit, offset), row_to_photo)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

fn row_to_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        mime_type: row.get(1)?,
        comment: row.get(2)?,
        created_at: row.get(3)?,
        thumbnail: VariantState::from(row.get::<_, bool>(4)?),
        resized: VariantState::from(row.get::<_, bool>(5)?),
        published: row.get(6)?,
    })
}
