//! Pixel buffers shared between the pool, the memory caches and delivered results.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use image::{DynamicImage, ImageBuffer};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Memory layout of a bitmap's pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    #[default]
    Rgba8,
    /// 8-bit red, green, blue.
    Rgb8,
    /// 8-bit luminance with alpha.
    LumaA8,
    /// 8-bit luminance.
    Luma8,
}

impl PixelFormat {
    /// Number of bytes a single pixel occupies.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::LumaA8 => 2,
            Self::Luma8 => 1,
        }
    }

    /// Returns true if transformations can operate on this format directly.
    #[must_use]
    pub const fn is_transformable(self) -> bool {
        matches!(self, Self::Rgba8)
    }

    /// Converts a decoded image into raw pixels of this format.
    #[must_use]
    pub fn convert(self, image: &DynamicImage) -> Vec<u8> {
        match self {
            Self::Rgba8 => image.to_rgba8().into_raw(),
            Self::Rgb8 => image.to_rgb8().into_raw(),
            Self::LumaA8 => image.to_luma_alpha8().into_raw(),
            Self::Luma8 => image.to_luma8().into_raw(),
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rgba8 => write!(f, "rgba8"),
            Self::Rgb8 => write!(f, "rgb8"),
            Self::LumaA8 => write!(f, "lumaa8"),
            Self::Luma8 => write!(f, "luma8"),
        }
    }
}

/// Process-unique identity of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl std::fmt::Display for BitmapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bmp-{}", self.0)
    }
}

struct BitmapInner {
    id: BitmapId,
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: RwLock<Vec<u8>>,
    prepared: AtomicBool,
}

/// A mutable pixel buffer tagged with its dimensions and pixel format.
///
/// Cloning is cheap and yields another handle to the same buffer. Ownership
/// in the pooling sense is tracked separately by the reference counter; the
/// handle itself only keeps the allocation alive.
#[derive(Clone)]
pub struct Bitmap {
    inner: Arc<BitmapInner>,
}

impl Bitmap {
    /// Allocates a zeroed bitmap.
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = byte_len(width, height, format);
        Self::with_pixels(width, height, format, vec![0; len])
    }

    /// Wraps existing pixels. Returns `None` if the buffer length does not
    /// match the dimensions and format.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == byte_len(width, height, format))
            .then(|| Self::with_pixels(width, height, format, pixels))
    }

    /// Copies a decoded image into a new bitmap of the requested format.
    #[must_use]
    pub fn from_image(image: &DynamicImage, format: PixelFormat) -> Self {
        Self::with_pixels(image.width(), image.height(), format, format.convert(image))
    }

    /// A zero-sized bitmap, used when a pipeline discards its pixels.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_pixels(0, 0, PixelFormat::Rgba8, Vec::new())
    }

    fn with_pixels(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BitmapInner {
                id: BitmapId(NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed)),
                width,
                height,
                format,
                pixels: RwLock::new(pixels),
                prepared: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the buffer identity.
    #[must_use]
    pub fn id(&self) -> BitmapId {
        self.inner.id
    }

    /// Returns the width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Returns the pixel format.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Returns the allocation size in bytes.
    #[must_use]
    pub fn byte_count(&self) -> usize {
        byte_len(self.inner.width, self.inner.height, self.inner.format)
    }

    /// Returns true for zero-sized bitmaps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.width == 0 || self.inner.height == 0
    }

    /// Read access to the raw pixels.
    pub fn pixels(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.inner.pixels.read()
    }

    /// Write access to the raw pixels.
    pub fn pixels_mut(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.inner.pixels.write()
    }

    /// Zeroes every pixel.
    pub fn erase(&self) {
        self.inner.pixels.write().fill(0);
        self.inner.prepared.store(false, Ordering::Release);
    }

    /// Overwrites this buffer with `image`, converting to this bitmap's format.
    /// Returns false if the dimensions differ.
    pub fn write_image(&self, image: &DynamicImage) -> bool {
        if image.width() != self.width() || image.height() != self.height() {
            return false;
        }
        let converted = self.format().convert(image);
        self.inner.pixels.write().copy_from_slice(&converted);
        self.inner.prepared.store(false, Ordering::Release);
        true
    }

    /// Builds an `image` crate view of the pixels (copies the buffer).
    #[must_use]
    pub fn to_image(&self) -> Option<DynamicImage> {
        let (w, h) = (self.width(), self.height());
        let raw = self.pixels().clone();
        match self.format() {
            PixelFormat::Rgba8 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
            PixelFormat::Rgb8 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
            PixelFormat::LumaA8 => {
                ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8)
            }
            PixelFormat::Luma8 => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        }
    }

    /// Marks the buffer as ready for synchronous rendering.
    pub fn prepare_to_draw(&self) {
        self.inner.prepared.store(true, Ordering::Release);
    }

    /// Returns true once `prepare_to_draw` has run since the last write.
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.inner.prepared.load(Ordering::Acquire)
    }

    /// Returns a handle that does not keep the buffer alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakBitmap {
        WeakBitmap {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Bitmap {}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.inner.id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("format", &self.inner.format)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`Bitmap`].
#[derive(Clone)]
pub struct WeakBitmap {
    id: BitmapId,
    inner: Weak<BitmapInner>,
}

impl WeakBitmap {
    /// Identity of the referenced buffer, available even after it is freed.
    #[must_use]
    pub const fn id(&self) -> BitmapId {
        self.id
    }

    /// Returns the bitmap if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Bitmap> {
        self.inner.upgrade().map(|inner| Bitmap { inner })
    }

    /// Returns true if the buffer has been freed.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl std::fmt::Debug for WeakBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakBitmap")
            .field("id", &self.id)
            .field("alive", &!self.is_dead())
            .finish()
    }
}

fn byte_len(width: u32, height: u32, format: PixelFormat) -> usize {
    width as usize * height as usize * format.bytes_per_pixel()
}
