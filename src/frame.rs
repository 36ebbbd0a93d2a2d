//! Per-Frame Host Interface
//!
//! [`FrameContext`] is the immutable snapshot the host renderer hands the
//! pass each frame: viewport, camera matrices, and borrowed views of the
//! frame's color and depth targets. Borrowed handles live only for the
//! duration of one call; the pass never stores them across frames, and
//! revalidates its own scratch allocations against the viewport instead.
//!
//! [`FrameBlackboard`] carries cross-pass transient data within a single
//! frame: the godray pass publishes its pre-composite color snapshot here
//! so downstream passes can sample it by name.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::tracked::Tracked;

// ─── Camera Classification ────────────────────────────────────────────────────

/// Host camera classification, used by the external scheduler to decide
/// whether the pass should be enqueued at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraKind {
    /// A regular in-game camera.
    #[default]
    Game,
    /// An asset/material preview camera. Never receives the effect.
    Preview,
    /// An editor scene-view camera. Receives the effect only when
    /// [`GodraySettings::show_in_scene_view`](crate::GodraySettings::show_in_scene_view)
    /// is set.
    SceneView,
}

// ─── Frame Context ────────────────────────────────────────────────────────────

/// Immutable per-frame snapshot supplied by the host renderer.
///
/// The color and depth views are borrowed for this frame only; the pass
/// writes the composited result back into `color_view` in place.
pub struct FrameContext<'a> {
    /// Viewport dimensions in pixels.
    pub viewport: (u32, u32),
    /// Camera projection matrix for this frame.
    pub projection: Mat4,
    /// Camera view (world-to-camera) matrix for this frame.
    pub view: Mat4,
    /// The frame's output color buffer.
    pub color_view: &'a Tracked<wgpu::TextureView>,
    /// Texture format of the output color buffer.
    pub color_format: wgpu::TextureFormat,
    /// The frame's depth buffer (depth-only aspect).
    pub depth_view: &'a Tracked<wgpu::TextureView>,
    /// Camera classification for scheduler gating.
    pub camera: CameraKind,
}

// ─── Frame Blackboard ─────────────────────────────────────────────────────────

/// Named texture slots shared between passes within one frame.
///
/// Entries are cleared by the host at frame start; a published view is
/// valid until the end of the frame.
#[derive(Default)]
pub struct FrameBlackboard {
    color_targets: FxHashMap<String, Tracked<wgpu::TextureView>>,
}

impl FrameBlackboard {
    /// Creates an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a color target under `name`, replacing any previous entry.
    pub fn publish(&mut self, name: &str, view: Tracked<wgpu::TextureView>) {
        self.color_targets.insert(name.to_owned(), view);
    }

    /// Looks up a published color target.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tracked<wgpu::TextureView>> {
        self.color_targets.get(name)
    }

    /// Number of published entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.color_targets.len()
    }

    /// Whether nothing has been published this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.color_targets.is_empty()
    }

    /// Drops all published entries. Called by the host at frame start.
    pub fn clear(&mut self) {
        self.color_targets.clear();
    }
}
