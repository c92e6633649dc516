use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const MAX_COMMENT_LENGTH: usize = 140;

/// Extension used in blob keys when the MIME type is not `image/*`.
const FALLBACK_EXT: &str = "ext";

/// A derived representation of a photo that is computed on first request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Thumbnail,
    Resized,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Thumbnail => "thumbnail",
            Variant::Resized => "resized",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantState {
    #[default]
    NotComputed,
    Computed,
}

impl VariantState {
    pub fn is_computed(&self) -> bool {
        matches!(self, VariantState::Computed)
    }
}

impl From<bool> for VariantState {
    fn from(computed: bool) -> Self {
        if computed {
            VariantState::Computed
        } else {
            VariantState::NotComputed
        }
    }
}

/// The size discriminator used by the image route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Raw,
    Thumbnail,
    Resized,
}

impl FromStr for Size {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Size::Raw),
            "thumbnail" => Ok(Size::Thumbnail),
            "resized" => Ok(Size::Resized),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPhoto {
    pub mime_type: String,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    pub id: String,
    pub mime_type: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub thumbnail: VariantState,
    pub resized: VariantState,
    pub published: bool,
}

impl Photo {
    pub fn new(id: String, new: NewPhoto) -> Result<Self> {
        let len = new.comment.chars().count();
        if len > MAX_COMMENT_LENGTH {
            return Err(Error::CommentTooLong {
                len,
                max: MAX_COMMENT_LENGTH,
            });
        }

        Ok(Self {
            id,
            mime_type: new.mime_type.to_lowercase(),
            comment: new.comment,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            thumbnail: VariantState::NotComputed,
            resized: VariantState::NotComputed,
            published: new.published.unwrap_or(true),
        })
    }

    pub fn ext(&self) -> &str {
        self.mime_type
            .strip_prefix("image/")
            .unwrap_or(FALLBACK_EXT)
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.id, self.ext())
    }

    pub fn variant_key(&self, variant: Variant) -> String {
        format!("{}.{}.{}", self.id, variant, self.ext())
    }

    pub fn state(&self, variant: Variant) -> VariantState {
        match variant {
            Variant::Thumbnail => self.thumbnail,
            Variant::Resized => self.resized,
        }
    }

    /// Records that the variant blob has been written. There is no way back
    /// to `NotComputed`.
    pub fn mark_computed(&mut self, variant: Variant) {
        match variant {
            Variant::Thumbnail => self.thumbnail = VariantState::Computed,
            Variant::Resized => self.resized = VariantState::Computed,
        }
    }
}
