//! Godray Pass Configuration
//!
//! [`GodraySettings`] is a flat record of tunable parameters, following the
//! pure-data pattern used by post-processing settings elsewhere: the host
//! owns and edits the record between frames, and the pass snapshots a
//! clamped copy once per frame before touching the GPU.
//!
//! Every ranged field is clamped to its documented domain by
//! [`GodraySettings::clamped`]; the pipeline never assumes the host
//! validated anything.

use glam::{Vec2, Vec4};

// ============================================================================
// Scheduling
// ============================================================================

/// Point in the host frame at which the pass is scheduled.
///
/// [`PassEvent::AfterRendering`] is the frame's terminal event: a pass
/// scheduled there has no meaningful input left to read, so execution
/// degrades to a deliberate no-op rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassEvent {
    /// After opaque scene geometry (the usual slot for light shafts).
    #[default]
    AfterOpaque,
    /// After transparent geometry.
    AfterTransparent,
    /// After the host's own post-processing chain.
    AfterPostProcess,
    /// After everything; terminal, executes as a no-op.
    AfterRendering,
}

bitflags::bitflags! {
    /// Scene-filter layer mask forwarded to the host's geometry draws.
    ///
    /// The blit pipeline itself does not consume this; it travels with the
    /// settings so the host can filter which renderers feed the pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderLayers: u32 {
        /// The default scene layer.
        const DEFAULT = 1;
        /// All layers.
        const ALL = u32::MAX;
    }
}

impl Default for RenderLayers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// GodraySettings
// ============================================================================

/// Godray post-processing configuration (pure data).
///
/// # Usage
///
/// ```rust,ignore
/// let mut settings = GodraySettings::default();
/// settings.downscale_factor = 0.5;
/// settings.fog_color = Vec4::new(1.0, 0.95, 0.8, 1.0);
/// let pass = GodrayPass::new(&device, color_format, settings);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GodraySettings {
    /// Whether the pass also runs for editor scene-view cameras.
    pub show_in_scene_view: bool,

    /// Frame event the pass is scheduled at.
    pub pass_event: PassEvent,

    /// Clear the mask target before ray marching instead of discarding
    /// its previous contents.
    pub clear_target: bool,

    /// Layer mask forwarded to host geometry draws.
    pub layer_mask: RenderLayers,

    /// Override material pass index forwarded to host geometry draws.
    pub override_material_pass: u32,

    /// When set, the pre-composite color buffer is also published under
    /// this name for downstream consumers. When `None`, the pipeline
    /// writes only into the camera's existing color buffer.
    pub color_target_id: Option<String>,

    /// Resolution multiplier for the ray-march mask buffer, in `(0, 1]`.
    ///
    /// Default: `0.5`
    pub downscale_factor: f32,

    /// How strongly the composited shafts blend over the scene, in `[0, 1]`.
    pub blend_rate: f32,

    /// Global opacity multiplier, in `[0, 1]`.
    pub global_alpha: f32,

    /// Shaft tint color (RGBA).
    pub fog_color: Vec4,

    /// Attenuation base for the ray march, in `[0, 128]`.
    pub attenuation_base: f32,

    /// Attenuation exponent, in `[0, 64]`.
    pub attenuation_power: f32,

    /// World-space step length per ray sample, in `[0, 5]`.
    pub ray_step: f32,

    /// Distance from the near plane before marching starts, in `[0, 5]`.
    pub ray_near_offset: f32,

    /// Per-axis sample jitter amplitude, each component in `[0, 0.05]`.
    /// Breaks banding at low step counts.
    pub ray_jitter: Vec2,
}

impl Default for GodraySettings {
    fn default() -> Self {
        Self {
            show_in_scene_view: false,
            pass_event: PassEvent::default(),
            clear_target: false,
            layer_mask: RenderLayers::default(),
            override_material_pass: 0,
            color_target_id: None,
            downscale_factor: 0.5,
            blend_rate: 1.0,
            global_alpha: 1.0,
            fog_color: Vec4::ONE,
            attenuation_base: 64.0,
            attenuation_power: 1.0,
            ray_step: 0.5,
            ray_near_offset: 0.0,
            ray_jitter: Vec2::splat(0.005),
        }
    }
}

impl GodraySettings {
    /// Returns a copy with every ranged field clamped to its documented
    /// domain. The pass snapshots this once per frame at setup.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            color_target_id: self
                .color_target_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .cloned(),
            downscale_factor: if self.downscale_factor.is_finite() && self.downscale_factor > 0.0 {
                self.downscale_factor.min(1.0)
            } else {
                1.0
            },
            blend_rate: self.blend_rate.clamp(0.0, 1.0),
            global_alpha: self.global_alpha.clamp(0.0, 1.0),
            fog_color: self.fog_color.clamp(Vec4::ZERO, Vec4::ONE),
            attenuation_base: self.attenuation_base.clamp(0.0, 128.0),
            attenuation_power: self.attenuation_power.clamp(0.0, 64.0),
            ray_step: self.ray_step.clamp(0.0, 5.0),
            ray_near_offset: self.ray_near_offset.clamp(0.0, 5.0),
            ray_jitter: self.ray_jitter.clamp(Vec2::ZERO, Vec2::splat(0.05)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_limits_every_ranged_field() {
        let settings = GodraySettings {
            downscale_factor: 3.0,
            blend_rate: -1.0,
            global_alpha: 7.5,
            fog_color: Vec4::new(2.0, -1.0, 0.5, 9.0),
            attenuation_base: 1000.0,
            attenuation_power: -3.0,
            ray_step: 100.0,
            ray_near_offset: -0.5,
            ray_jitter: Vec2::new(1.0, -1.0),
            ..GodraySettings::default()
        };

        let c = settings.clamped();
        assert_eq!(c.downscale_factor, 1.0);
        assert_eq!(c.blend_rate, 0.0);
        assert_eq!(c.global_alpha, 1.0);
        assert_eq!(c.fog_color, Vec4::new(1.0, 0.0, 0.5, 1.0));
        assert_eq!(c.attenuation_base, 128.0);
        assert_eq!(c.attenuation_power, 0.0);
        assert_eq!(c.ray_step, 5.0);
        assert_eq!(c.ray_near_offset, 0.0);
        assert_eq!(c.ray_jitter, Vec2::new(0.05, 0.0));
    }

    #[test]
    fn clamped_rejects_degenerate_downscale() {
        let mut settings = GodraySettings {
            downscale_factor: 0.0,
            ..GodraySettings::default()
        };
        assert_eq!(settings.clamped().downscale_factor, 1.0);

        settings.downscale_factor = f32::NAN;
        assert_eq!(settings.clamped().downscale_factor, 1.0);
    }

    #[test]
    fn empty_color_target_id_means_unpublished() {
        let settings = GodraySettings {
            color_target_id: Some(String::new()),
            ..GodraySettings::default()
        };
        assert_eq!(settings.clamped().color_target_id, None);
    }

    #[test]
    fn in_range_values_pass_through() {
        let settings = GodraySettings {
            downscale_factor: 0.25,
            blend_rate: 0.7,
            attenuation_base: 32.0,
            ..GodraySettings::default()
        };
        let c = settings.clamped();
        assert_eq!(c.downscale_factor, 0.25);
        assert_eq!(c.blend_rate, 0.7);
        assert_eq!(c.attenuation_base, 32.0);
    }
}
