pub mod ids;
pub mod image;
pub mod library;
pub mod photos;
pub mod variants;
