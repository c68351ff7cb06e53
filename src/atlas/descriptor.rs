use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use image::RgbaImage;

use crate::foundation::error::{AtlasflipError, AtlasflipResult};

/// One named rectangular region of the atlas image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AtlasRegion {
    /// Left edge in atlas pixels.
    pub x: u32,
    /// Top edge in atlas pixels.
    pub y: u32,
    /// Stored width in atlas pixels.
    pub w: u32,
    /// Stored height in atlas pixels.
    pub h: u32,
    /// When set, the stored pixels are the sprite rotated a quarter turn
    /// clockwise; consumers un-rotate before use.
    #[serde(default)]
    pub rotated: bool,
}

/// Sprite index for one atlas image.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AtlasDescriptor {
    /// Regions keyed by sprite name.
    pub sprites: BTreeMap<String, AtlasRegion>,
}

impl AtlasDescriptor {
    /// Parse an atlas descriptor from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> AtlasflipResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| AtlasflipError::serde(format!("parse atlas descriptor JSON: {e}")))
    }

    /// Parse an atlas descriptor from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> AtlasflipResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            AtlasflipError::validation(format!("open atlas descriptor '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Reject structurally unusable regions.
    ///
    /// Region placement against the atlas image bounds is checked at first
    /// use by the slicer, so a package whose malformed regions are never
    /// referenced still loads. Zero-area regions are rejected eagerly.
    pub fn validate(&self) -> AtlasflipResult<()> {
        for (name, region) in &self.sprites {
            if region.w == 0 || region.h == 0 {
                return Err(AtlasflipError::validation(format!(
                    "sprite '{name}' has a zero-area region"
                )));
            }
        }
        Ok(())
    }
}

/// Decode an atlas image file into an RGBA buffer.
pub fn load_atlas_image(path: impl AsRef<Path>) -> AtlasflipResult<RgbaImage> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("decode atlas image '{}'", path.display()))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/descriptor.rs"]
mod tests;
