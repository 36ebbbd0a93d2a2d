//! Per-Frame Parameter Derivation
//!
//! Maps a [`FrameContext`] + [`GodraySettings`] snapshot to the uniform
//! block bound before the ray-march kernel runs. Derivation is a pure
//! function of this frame's inputs — nothing is cached across frames, so
//! the inverse matrices can never go stale.
//!
//! Screen-space ray reconstruction samples the depth buffer and unprojects
//! through `inverse(projection * view)`; if that inversion is numerically
//! invalid the shader would read garbage positions. [`derive_parameters`]
//! therefore verifies every matrix is finite and invertible, and on
//! failure substitutes identity transforms and flags the frame as
//! degraded so the executor skips the effect.

use glam::{Mat4, Vec2, Vec4};

use crate::frame::FrameContext;
use crate::settings::GodraySettings;

/// Determinants below this magnitude are treated as non-invertible.
const DETERMINANT_EPSILON: f32 = 1e-8;

// ============================================================================
// GPU Uniform Struct
// ============================================================================

/// Uniform block for the ray-march and composite kernels.
///
/// Layout matches `GodrayUniforms` in `shaders/godray.wgsl` field for
/// field: three column-major matrices, one color, then two vec4-sized
/// rows of scalars. 240 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GodrayUniforms {
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view_projection: Mat4,
    pub fog_color: Vec4,
    pub blend_rate: f32,
    pub global_alpha: f32,
    pub attenuation_base: f32,
    pub attenuation_power: f32,
    pub ray_step: f32,
    pub ray_near_offset: f32,
    pub ray_jitter: Vec2,
}

impl Default for GodrayUniforms {
    fn default() -> Self {
        Self {
            inverse_view: Mat4::IDENTITY,
            inverse_projection: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
            fog_color: Vec4::ONE,
            blend_rate: 1.0,
            global_alpha: 1.0,
            attenuation_base: 64.0,
            attenuation_power: 1.0,
            ray_step: 0.5,
            ray_near_offset: 0.0,
            ray_jitter: Vec2::ZERO,
        }
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// Result of per-frame parameter derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedParameters {
    /// Uniform data ready for upload.
    pub uniforms: GodrayUniforms,
    /// True when any camera matrix failed inversion. The uniforms then
    /// hold identity transforms and the executor must skip the frame.
    pub degraded: bool,
}

/// Inverts `m` only if it is finite and comfortably non-singular.
fn try_invert(m: Mat4) -> Option<Mat4> {
    if !m.is_finite() {
        return None;
    }
    let det = m.determinant();
    if !det.is_finite() || det.abs() <= DETERMINANT_EPSILON {
        return None;
    }
    Some(m.inverse())
}

/// The three camera inverses bound by the ray-march kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInverses {
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view_projection: Mat4,
    /// True when any inversion failed and identity was substituted.
    pub degraded: bool,
}

/// Inverts the camera matrices for one frame, falling back to identity on
/// any numerical failure.
#[must_use]
pub fn invert_camera(view: Mat4, projection: Mat4) -> CameraInverses {
    let inverse_view = try_invert(view);
    let inverse_projection = try_invert(projection);
    let inverse_view_projection = try_invert(projection * view);

    CameraInverses {
        degraded: inverse_view.is_none()
            || inverse_projection.is_none()
            || inverse_view_projection.is_none(),
        inverse_view: inverse_view.unwrap_or(Mat4::IDENTITY),
        inverse_projection: inverse_projection.unwrap_or(Mat4::IDENTITY),
        inverse_view_projection: inverse_view_projection.unwrap_or(Mat4::IDENTITY),
    }
}

/// Derives the frame's uniform block from the camera snapshot and clamped
/// settings. Pure and deterministic; must be called with matrices captured
/// for *this* frame.
#[must_use]
pub fn derive_parameters(frame: &FrameContext<'_>, settings: &GodraySettings) -> DerivedParameters {
    let inverses = invert_camera(frame.view, frame.projection);

    let uniforms = GodrayUniforms {
        inverse_view: inverses.inverse_view,
        inverse_projection: inverses.inverse_projection,
        inverse_view_projection: inverses.inverse_view_projection,
        fog_color: settings.fog_color,
        blend_rate: settings.blend_rate,
        global_alpha: settings.global_alpha,
        attenuation_base: settings.attenuation_base,
        attenuation_power: settings.attenuation_power,
        ray_step: settings.ray_step,
        ray_near_offset: settings.ray_near_offset,
        ray_jitter: settings.ray_jitter,
    };

    DerivedParameters {
        uniforms,
        degraded: inverses.degraded,
    }
}
