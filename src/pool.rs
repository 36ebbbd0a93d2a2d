//! Scratch Texture Pool
//!
//! Owns the GPU color surfaces the pass uses as intermediate storage
//! within one frame. Unlike a transient per-frame pool, entries here are
//! keyed by logical name and persist across frames: `ensure_sized` only
//! touches the GPU when the requested shape actually differs from the
//! current allocation, so a stable viewport costs zero allocations per
//! frame.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               ScratchTexturePool                 │
//! │                                                  │
//! │  entries: FxHashMap<&'static str, Scratch>       │
//! │                                                  │
//! │  ensure_sized(key, desc) → Option<&Scratch>      │
//! │  release(key)                                    │
//! │  release_all()          (idempotent)             │
//! │  allocation_count()     (observable for tests)   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Ownership
//!
//! A pool belongs to exactly one pass instance. The frame's output and
//! depth buffers are *borrowed* from the host per call and never live
//! here; only pipeline-owned scratch surfaces do.

use rustc_hash::FxHashMap;

use crate::tracked::Tracked;

// ─── Public Types ─────────────────────────────────────────────────────────────

/// Descriptor for requesting a scratch surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub label: &'static str,
}

impl ScratchDesc {
    /// A render-attachment + sampleable color surface, the common case.
    #[must_use]
    pub fn color(
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &'static str,
    ) -> Self {
        Self {
            width,
            height,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            label,
        }
    }

    /// Whether the requested shape matches an existing allocation.
    fn matches(&self, other: &ScratchDesc) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format == other.format
            && self.usage == other.usage
    }
}

/// A pool-owned scratch surface with its default view.
pub struct ScratchTexture {
    desc: ScratchDesc,
    texture: wgpu::Texture,
    view: Tracked<wgpu::TextureView>,
}

impl ScratchTexture {
    fn new(device: &wgpu::Device, desc: ScratchDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });

        let view = Tracked::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));

        Self {
            desc,
            texture,
            view,
        }
    }

    /// The surface's allocation shape.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &ScratchDesc {
        &self.desc
    }

    /// The raw texture, e.g. for `copy_texture_to_texture`.
    #[inline]
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// The default full-texture view.
    #[inline]
    #[must_use]
    pub fn view(&self) -> &Tracked<wgpu::TextureView> {
        &self.view
    }
}

// ─── Sizing Helpers ───────────────────────────────────────────────────────────

/// Applies a downscale factor to viewport dimensions, rounding down but
/// never below 1×1. Returns `None` for a degenerate viewport; callers
/// must treat that as "buffer unavailable", not as a 0×0 allocation.
#[must_use]
pub fn scaled_extent(viewport: (u32, u32), factor: f32) -> Option<(u32, u32)> {
    let (width, height) = viewport;
    if width == 0 || height == 0 {
        return None;
    }
    let w = ((width as f32 * factor) as u32).max(1);
    let h = ((height as f32 * factor) as u32).max(1);
    Some((w, h))
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

/// Size-aware pool of named scratch color surfaces.
#[derive(Default)]
pub struct ScratchTexturePool {
    entries: FxHashMap<&'static str, ScratchTexture>,
    allocation_count: u64,
}

impl ScratchTexturePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the surface for `key`, (re)allocating only when no surface
    /// exists or its (width, height, format, usage) differs from `desc`.
    ///
    /// Returns `None` without touching the GPU when `desc` is zero-sized;
    /// GPU allocation of a degenerate surface is never attempted.
    pub fn ensure_sized(
        &mut self,
        device: &wgpu::Device,
        key: &'static str,
        desc: ScratchDesc,
    ) -> Option<&ScratchTexture> {
        if desc.width == 0 || desc.height == 0 {
            return None;
        }

        let needs_realloc = self
            .entries
            .get(key)
            .is_none_or(|existing| !existing.desc.matches(&desc));

        if needs_realloc {
            log::debug!(
                "scratch '{key}' allocated: {}x{} {:?}",
                desc.width,
                desc.height,
                desc.format,
            );
            self.entries.insert(key, ScratchTexture::new(device, desc));
            self.allocation_count += 1;
        }

        self.entries.get(key)
    }

    /// Looks up an already-ensured surface without allocating.
    #[must_use]
    pub fn get(&self, key: &'static str) -> Option<&ScratchTexture> {
        self.entries.get(key)
    }

    /// Frees the surface for `key` immediately. No-op for unknown keys.
    pub fn release(&mut self, key: &'static str) {
        self.entries.remove(key);
    }

    /// Frees every surface. Safe to call repeatedly.
    pub fn release_all(&mut self) {
        self.entries.clear();
    }

    /// Total GPU allocations performed over the pool's lifetime.
    ///
    /// Stays flat across frames while sizes are stable; the tests pin the
    /// reallocate-only-on-change contract against this.
    #[inline]
    #[must_use]
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count
    }

    /// Number of currently live surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_extent_rounds_down_from_viewport() {
        assert_eq!(scaled_extent((1920, 1080), 0.5), Some((960, 540)));
        assert_eq!(scaled_extent((1920, 1080), 1.0), Some((1920, 1080)));
        assert_eq!(scaled_extent((1279, 719), 0.5), Some((639, 359)));
    }

    #[test]
    fn scaled_extent_never_collapses_to_zero() {
        assert_eq!(scaled_extent((3, 3), 0.1), Some((1, 1)));
    }

    #[test]
    fn scaled_extent_rejects_degenerate_viewport() {
        assert_eq!(scaled_extent((0, 1080), 0.5), None);
        assert_eq!(scaled_extent((1920, 0), 0.5), None);
        assert_eq!(scaled_extent((0, 0), 1.0), None);
    }

    #[test]
    fn desc_match_is_shape_and_format_sensitive() {
        let base = ScratchDesc::color(64, 64, wgpu::TextureFormat::R8Unorm, "mask");
        assert!(base.matches(&base));
        assert!(!base.matches(&ScratchDesc::color(32, 64, wgpu::TextureFormat::R8Unorm, "mask")));
        assert!(!base.matches(&ScratchDesc::color(
            64,
            64,
            wgpu::TextureFormat::Rgba8Unorm,
            "mask"
        )));
        // Labels are cosmetic; they do not force a reallocation.
        assert!(base.matches(&ScratchDesc::color(64, 64, wgpu::TextureFormat::R8Unorm, "other")));
    }
}
