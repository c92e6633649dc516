use crate::services::library::PhotoLibrary;
use crate::{Config, Database};

pub struct AppState {
    pub library: PhotoLibrary,
}

impl AppState {
    pub fn new(config: &Config, db: Database) -> Self {
        Self::from_library(PhotoLibrary::from_config(config, db))
    }

    pub fn from_library(library: PhotoLibrary) -> Self {
        Self { library }
    }
}
