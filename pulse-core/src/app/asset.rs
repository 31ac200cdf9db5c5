//! Asset loading
//!
//! The picker integration is reduced to an [`AssetLoader`]: given an opaque
//! [`SelectionToken`] it asynchronously yields the raw bytes, or nothing.
//! [`decode_image`] turns bytes into an [`ImageAsset`] by recognising the
//! container signature; it does not rasterise.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Opaque handle identifying a user's selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionToken(String);

impl SelectionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Future returned by [`AssetLoader::load`].
pub type LoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, AssetError>> + Send + 'a>>;

/// Asynchronous source of selected asset data.
pub trait AssetLoader: Send + Sync {
    /// Load the bytes behind `token`. `Ok(None)` means the selection has no
    /// data.
    fn load<'a>(&'a self, token: &'a SelectionToken) -> LoadFuture<'a>;
}

/// Loader backed by an in-memory table.
#[derive(Debug, Default)]
pub struct InMemoryAssets {
    assets: RwLock<HashMap<SelectionToken, Arc<[u8]>>>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: SelectionToken, bytes: impl Into<Arc<[u8]>>) {
        self.assets.write().insert(token, bytes.into());
    }
}

impl AssetLoader for InMemoryAssets {
    fn load<'a>(&'a self, token: &'a SelectionToken) -> LoadFuture<'a> {
        Box::pin(async move {
            let bytes = self.assets.read().get(token).map(|bytes| bytes.to_vec());
            Ok::<_, AssetError>(bytes)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

/// A recognised image.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Identify PNG, JPEG and GIF data. Returns `None` for anything else.
///
/// PNG dimensions come from the IHDR chunk and GIF dimensions from the
/// logical screen descriptor; JPEG dimensions are left unknown.
pub fn decode_image(bytes: &[u8]) -> Option<ImageAsset> {
    let (format, width, height) = if bytes.starts_with(PNG_SIGNATURE) {
        // 8-byte signature, 4-byte length, "IHDR", then width and height.
        if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
        (ImageFormat::Png, Some(width), Some(height))
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        if bytes.len() < 10 {
            return None;
        }
        let width = u16::from_le_bytes([bytes[6], bytes[7]]);
        let height = u16::from_le_bytes([bytes[8], bytes[9]]);
        (ImageFormat::Gif, Some(u32::from(width)), Some(u32::from(height)))
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        (ImageFormat::Jpeg, None, None)
    } else {
        return None;
    };

    Some(ImageAsset {
        format,
        width,
        height,
        bytes: Arc::from(bytes),
    })
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes
}
