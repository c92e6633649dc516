use anyhow::Result;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = r#"[server]
host = "127.0.0.1"
port = 3000

[database]
path = "./data/photos.db"

[storage]
backend = "filesystem"
root = "./data/blobs"
bucket = "photos"

[images]
thumbnail_size = 220
resized_width = 480
resized_height = 360
jpeg_quality = 85
max_upload_size = "10MB"
per_page = 9
"#;

pub async fn run(path: PathBuf) -> Result<()> {
    let config_path = path.join("photos.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(path.join("data/blobs"))?;
    std::fs::write(&config_path, DEFAULT_CONFIG)?;

    tracing::info!("Created photo site at {:?}", path);
    tracing::info!("Run 'photos upload <file>' to add a photo");
    tracing::info!("Run 'photos serve' to start the server");

    Ok(())
}
