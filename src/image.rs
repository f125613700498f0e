//! Asynchronous image loading
//!
//! The canvas only needs an image's natural size to lay it out; pixel data
//! stays with the rendering surface. Loads run as local futures polled by
//! the canvas, so loaders do not have to be `Send`.

use async_trait::async_trait;

use crate::geometry::Size;
use crate::scene::{ImageSource, LayerId};

/// Errors produced while loading an image
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageLoadError {
    #[error("image {src} could not be loaded: {reason}")]
    Unavailable { src: String, reason: String },

    #[error("no image loader configured for {0}")]
    NoLoader(String),
}

/// Resolves the natural size of an image resource
#[async_trait(?Send)]
pub trait ImageLoader {
    async fn load(&self, source: &ImageSource) -> Result<Size, ImageLoadError>;
}

/// A finished load, routed back to the item that requested it
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLoadOutcome {
    pub layer: LayerId,
    pub item_id: String,
    pub src: String,
    pub result: Result<Size, ImageLoadError>,
}

/// Reads image headers from the local filesystem
#[cfg(feature = "fs-loader")]
#[derive(Debug, Clone, Default)]
pub struct FileImageLoader {
    root: Option<std::path::PathBuf>,
}

#[cfg(feature = "fs-loader")]
impl FileImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative sources against `root`
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, src: &str) -> std::path::PathBuf {
        match &self.root {
            Some(root) => root.join(src),
            None => std::path::PathBuf::from(src),
        }
    }
}

#[cfg(feature = "fs-loader")]
#[async_trait(?Send)]
impl ImageLoader for FileImageLoader {
    async fn load(&self, source: &ImageSource) -> Result<Size, ImageLoadError> {
        let path = self.path_for(&source.src);
        let (width, height) =
            ::image::image_dimensions(&path).map_err(|e| ImageLoadError::Unavailable {
                src: source.src.clone(),
                reason: e.to_string(),
            })?;
        Ok(Size::new(width as f64, height as f64))
    }
}

#[cfg(all(test, feature = "fs-loader"))]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_missing_file_is_unavailable() {
        let loader = FileImageLoader::with_root(std::env::temp_dir());
        let result = block_on(loader.load(&ImageSource::new("mapcanvas-does-not-exist.png")));
        assert!(matches!(result, Err(ImageLoadError::Unavailable { .. })));
    }

    #[test]
    fn test_reads_dimensions() {
        let path = std::env::temp_dir().join("mapcanvas-loader-test.png");
        ::image::RgbaImage::new(7, 3).save(&path).unwrap();

        let loader = FileImageLoader::new();
        let size = block_on(loader.load(&ImageSource::new(path.to_string_lossy()))).unwrap();
        assert_eq!(size, Size::new(7.0, 3.0));
        let _ = std::fs::remove_file(path);
    }
}
