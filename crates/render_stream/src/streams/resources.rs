//! Backing resources for streams

use crate::link::PixelFormat;

/// Backing resources could not be created
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Zero width or height
    #[error("stream '{name}' has an empty resolution {width}x{height}")]
    EmptyResolution {
        /// Stream name
        name: String,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Format cannot be rendered to
    #[error("stream '{name}' has unsupported pixel format {format:?}")]
    UnsupportedFormat {
        /// Stream name
        name: String,
        /// Requested format
        format: PixelFormat,
    },

    /// The platform refused the allocation
    #[error("allocation failed: {0}")]
    Platform(String),
}

/// Description of an allocated render target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Size of one frame in bytes
    pub frame_bytes: usize,
}

/// Creates the render targets streams are captured into
pub trait ResourceAllocator: Send {
    /// Allocate a target for the named stream
    fn allocate(&self, name: &str, width: u32, height: u32, format: PixelFormat) -> Result<StreamTarget, ResourceError>;
}

/// Allocator that only sizes CPU-side frames
#[derive(Debug, Clone, Copy, Default)]
pub struct HostResourceAllocator;

impl ResourceAllocator for HostResourceAllocator {
    fn allocate(&self, name: &str, width: u32, height: u32, format: PixelFormat) -> Result<StreamTarget, ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError::EmptyResolution {
                name: name.to_string(),
                width,
                height,
            });
        }
        let bytes_per_pixel = format.bytes_per_pixel().ok_or_else(|| ResourceError::UnsupportedFormat {
            name: name.to_string(),
            format,
        })?;
        let frame_bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
            .ok_or_else(|| ResourceError::Platform(format!("stream '{name}' frame size overflows")))?;

        Ok(StreamTarget {
            width,
            height,
            format,
            frame_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        let target = HostResourceAllocator.allocate("Left", 1920, 1080, PixelFormat::Rgba16).unwrap();
        assert_eq!(target.frame_bytes, 1920 * 1080 * 8);
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert!(matches!(
            HostResourceAllocator.allocate("a", 0, 10, PixelFormat::Rgba8),
            Err(ResourceError::EmptyResolution { .. })
        ));
        assert!(matches!(
            HostResourceAllocator.allocate("b", 10, 10, PixelFormat::Invalid),
            Err(ResourceError::UnsupportedFormat { .. })
        ));
    }
}
