use serde::{Deserialize, Serialize};

pub const STORAGE_IMAGE_PREFIX: &str = "static/img/";
pub const PUBLIC_IMAGE_PREFIX: &str = "/img/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub style_tags: Vec<String>,
}

/// Rewrites the service's storage-relative image path to the public-facing
/// one. Pure string transform applied at render time only; the stored
/// payload keeps the path the service returned.
pub fn rewrite_image_path(path: &str) -> String {
    path.replacen(STORAGE_IMAGE_PREFIX, PUBLIC_IMAGE_PREFIX, 1)
}
