use crate::models::Size;
use crate::services::photos;
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct Pagination {
    page: Option<String>,
}

impl Pagination {
    /// Anything but a run of digits means the first page, as does `0`.
    /// Numbers too large for `usize` land past the last page.
    fn page(&self) -> usize {
        match self.page.as_deref() {
            Some(raw) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
                raw.parse().unwrap_or(usize::MAX).max(1)
            }
            _ => 1,
        }
    }
}

/// What `/photos/{file}` names: a record, or one of its images as
/// `{id}.{size}.{ext}`.
#[derive(Debug, PartialEq, Eq)]
enum PhotoPath<'a> {
    Detail(&'a str),
    Image { id: &'a str, size: Size },
}

fn parse_photo_path(file: &str) -> Option<PhotoPath<'_>> {
    let parts: Vec<&str> = file.split('.').collect();
    match parts.as_slice() {
        [id] if !id.is_empty() => Some(PhotoPath::Detail(*id)),
        // The extension is decorative; the stored MIME type decides.
        [id, size, _ext] if !id.is_empty() => Some(PhotoPath::Image {
            id: *id,
            size: size.parse().ok()?,
        }),
        _ => None,
    }
}

/// GET /photos
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Response> {
    let page = pagination.page();
    let per_page = state.library.sizes().per_page;

    let db = state.library.db().clone();
    let listing = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let total = photos::count_published(&db)?;
        let last_page = (total as usize).div_ceil(per_page).max(1);
        if page > last_page {
            return Ok(None);
        }
        let items = photos::list_published(&db, per_page, (page - 1) * per_page)?;
        Ok(Some((total, last_page, items)))
    })
    .await??;

    let Some((total, last_page, items)) = listing else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    Ok(Json(serde_json::json!({
        "data": items,
        "meta": {
            "total": total,
            "page": page,
            "per_page": per_page,
            "last_page": last_page,
        }
    }))
    .into_response())
}

/// GET /photos/
pub async fn list_slash() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/photos")]).into_response()
}

/// GET /photos/{id} and GET /photos/{id}.{size}.{ext}
pub async fn photo(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> AppResult<Response> {
    let (id, size) = match parse_photo_path(&file) {
        Some(PhotoPath::Detail(id)) => (id.to_string(), None),
        Some(PhotoPath::Image { id, size }) => (id.to_string(), Some(size)),
        None => return Ok(StatusCode::NOT_FOUND.into_response()),
    };

    let Some(size) = size else {
        let record = tokio::task::spawn_blocking(move || state.library.photo(&id)).await??;
        return Ok(Json(serde_json::json!({ "data": record })).into_response());
    };

    let image = tokio::task::spawn_blocking(move || state.library.image(&id, size)).await??;
    Ok(([(header::CONTENT_TYPE, image.mime_type)], image.data).into_response())
}
