//! # Texture — Decal Images and Reference Maps
//!
//! Two kinds of image feed the compositor:
//!
//! - **Decal images** ([`DecalImage`]): ordinary RGBA8 pictures with straight
//!   (non-premultiplied) alpha, loaded from PNG/JPEG through the `image` crate.
//!   A backend turns them into a [`TextureHandle`].
//! - **Reference maps** ([`ReferenceMaps`]): two floating-point images laid out
//!   in the *surface's* UV space. Texel `(u, v)` of the position map holds the
//!   surface point that UV lands on; the normal map holds its normal. They are
//!   produced offline by a baking tool. A position texel with alpha 0 means no
//!   surface covers that UV.
//!
//! Handles are plain indices into the backend's texture list, same as the rest
//! of the render code.

use std::fmt;
use std::path::Path;

use crate::math::{Vec2, Vec3, Vec4};

/// Handle to a decal image uploaded to a [`CompositeBackend`](super::CompositeBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) usize);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors from loading, building, or saving images.
#[derive(Debug)]
pub enum TextureError {
    /// Failed to read or decode an image file.
    Load(String),
    /// Failed to encode or write an image file.
    Save(String),
    /// Pixel buffer length does not match the stated dimensions.
    SizeMismatch { expected: usize, actual: usize },
    /// Position and normal maps have different dimensions.
    ReferenceMismatch { position: (u32, u32), normal: (u32, u32) },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Load(e) => write!(f, "image load failed: {e}"),
            TextureError::Save(e) => write!(f, "image save failed: {e}"),
            TextureError::SizeMismatch { expected, actual } => {
                write!(f, "pixel buffer has {actual} bytes, expected {expected}")
            }
            TextureError::ReferenceMismatch { position, normal } => write!(
                f,
                "reference maps differ in size: position {}x{}, normal {}x{}",
                position.0, position.1, normal.0, normal.1
            ),
        }
    }
}

impl std::error::Error for TextureError {}

// ── DecalImage ──────────────────────────────────────────────────────────

/// An RGBA8 image with straight alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecalImage {
    /// Load a PNG or JPEG from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| TextureError::Load(format!("'{}': {e}", path.display())))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// Wrap raw RGBA8 bytes (row-major, top row first).
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || width == 0 || height == 0 {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            pixels: rgba.repeat(width as usize * height as usize),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Texel at integer coordinates, clamped to the edge, as linear [0, 1].
    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let p = &self.pixels[i..i + 4];
        Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
    }

    /// Bilinear sample with clamp-to-edge addressing. `uv` (0,0) is the
    /// top-left corner.
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}

// ── FloatImage ──────────────────────────────────────────────────────────

/// A row-major RGBA f32 image. Used for reference maps and the CPU output.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    width: u32,
    height: u32,
    data: Vec<Vec4>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every texel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Vec4) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }

    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) as usize;
            self.data[i] = value;
        }
    }

    pub fn fill(&mut self, value: Vec4) {
        self.data.fill(value);
    }

    /// Nearest-texel lookup for a UV in [0, 1]², clamped to the edge.
    pub fn sample_nearest(&self, uv: Vec2) -> Vec4 {
        if self.data.is_empty() {
            return Vec4::ZERO;
        }
        let x = ((uv.x * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as u32;
        let y = ((uv.y * self.height as f32) as i64).clamp(0, self.height as i64 - 1) as u32;
        self.data[(y * self.width + x) as usize]
    }

    /// Quantize to an 8-bit image.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let mut raw = Vec::with_capacity(self.data.len() * 4);
        for p in &self.data {
            let c = (p.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
            raw.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, c.w as u8]);
        }
        image::RgbaImage::from_raw(self.width, self.height, raw).unwrap_or_default()
    }

    /// Write the image as an 8-bit PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), TextureError> {
        let path = path.as_ref();
        self.to_rgba8()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| TextureError::Save(format!("'{}': {e}", path.display())))
    }
}

// ── ReferenceMaps ───────────────────────────────────────────────────────

/// Baked position and normal maps of the target surface, in its UV space.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMaps {
    position: FloatImage,
    normal: FloatImage,
}

impl ReferenceMaps {
    pub fn new(position: FloatImage, normal: FloatImage) -> Result<Self, TextureError> {
        if position.dimensions() != normal.dimensions() {
            return Err(TextureError::ReferenceMismatch {
                position: position.dimensions(),
                normal: normal.dimensions(),
            });
        }
        Ok(Self { position, normal })
    }

    /// Maps for a flat square surface on the XZ plane, centered at the origin,
    /// `extent` units wide, facing `+Y`. UV `u` runs along `+X` and `v` along
    /// `+Z`.
    ///
    /// Handy for demos and tests that don't have a baked asset.
    pub fn ground_plane(resolution: u32, extent: f32) -> Self {
        let res = resolution.max(1);
        let position = FloatImage::from_fn(res, res, |x, y| {
            let u = (x as f32 + 0.5) / res as f32;
            let v = (y as f32 + 0.5) / res as f32;
            Vec3::new((u - 0.5) * extent, 0.0, (v - 0.5) * extent).extend(1.0)
        });
        let normal = FloatImage::new(res, res, Vec4::new(0.0, 1.0, 0.0, 1.0));
        Self { position, normal }
    }

    pub fn position(&self) -> &FloatImage {
        &self.position
    }

    pub fn normal(&self) -> &FloatImage {
        &self.normal
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.position.dimensions()
    }

    /// Surface point and normal under a UV, or `None` where no surface is baked.
    pub fn lookup(&self, uv: Vec2) -> Option<(Vec3, Vec3)> {
        let p = self.position.sample_nearest(uv);
        if p.w <= 0.0 {
            return None;
        }
        let n = self.normal.sample_nearest(uv);
        Some((p.truncate(), n.truncate()))
    }
}
