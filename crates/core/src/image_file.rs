//! The photograph picked in the image-capture step.

use std::fmt;

use image::ImageFormat;
use serde::Serialize;

use crate::error::CoreError;

/// Largest accepted upload (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Longest extension taken from the original file name.
pub const MAX_EXTENSION_LEN: usize = 5;

/// Image encodings accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical file extension for the encoding.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Identify the encoding from the file header.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

/// An image file held in memory until the submission is uploaded.
#[derive(Clone, PartialEq)]
pub struct ImageFile {
    file_name: String,
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let file_name = file_name.into();
        if bytes.is_empty() {
            return Err(CoreError::Validation(format!(
                "Image '{file_name}' is empty"
            )));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(CoreError::Validation(format!(
                "Image '{file_name}' is {} bytes; the limit is {MAX_IMAGE_BYTES}",
                bytes.len()
            )));
        }
        let kind = ImageKind::sniff(&bytes).ok_or_else(|| {
            CoreError::Validation(format!(
                "Image '{file_name}' is not a JPG, PNG or WEBP file"
            ))
        })?;

        Ok(Self {
            file_name,
            kind,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn content_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercased extension of the original file name.
    ///
    /// The name is client-supplied, so only a short ASCII alphanumeric
    /// extension is kept. Anything else yields the extension of the sniffed
    /// encoding.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext))
                if (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                    && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
            {
                ext.to_ascii_lowercase()
            }
            _ => self.kind.extension().to_string(),
        }
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .finish()
    }
}
