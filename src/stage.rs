//! Blit Stage Model
//!
//! The executor runs a fixed, strictly sequential list of stages; later
//! stages may read what earlier stages wrote within the same frame, and
//! nothing is ever reordered. This module describes that list as data so
//! the read-after-write and aliasing rules can be checked *before* any
//! GPU command is recorded; a rejected sequence leaves the frame's
//! output byte-identical.

use crate::errors::{GodrayError, Result};

// ─── Buffers & Kernels ────────────────────────────────────────────────────────

/// Logical buffer role within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageBuffer {
    /// The frame's output color buffer (borrowed from the host).
    OutputColor,
    /// The frame's depth buffer (read-only).
    Depth,
    /// A pool-owned scratch surface, by logical key.
    Scratch(&'static str),
}

/// The shader program a stage invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Ray-marches the light shafts into a (possibly downsampled) mask.
    RayMarch,
    /// Blends the upsampled mask over the output buffer.
    ///
    /// In-place safe on the output: the kernel samples only the scratch
    /// mask, while the previous output contents enter through the
    /// fixed-function blend unit (`LoadOp::Load` + alpha blending), never
    /// through a sampler. Under wgpu usage scopes that is the only legal
    /// way to read and write the same texture in one pass.
    Composite,
}

impl Kernel {
    /// Whether the kernel may name the same buffer as both input and
    /// output.
    #[must_use]
    pub fn in_place_safe(self) -> bool {
        match self {
            Kernel::RayMarch => false,
            Kernel::Composite => true,
        }
    }
}

// ─── Stages ───────────────────────────────────────────────────────────────────

/// One kernel invocation with its buffer wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Buffers the kernel samples or blends from.
    pub reads: &'static [StageBuffer],
    /// The render target.
    pub writes: StageBuffer,
    /// The program to invoke.
    pub kernel: Kernel,
}

/// Pool key of the downsampled single-channel ray-march mask.
pub const MASK_SCRATCH: &str = "godray.mask";

/// Pool key of the full-resolution pre-composite color snapshot.
pub const SNAPSHOT_SCRATCH: &str = "godray.color_snapshot";

/// The fixed two-stage godray sequence.
///
/// 1. Ray march: samples the scene color and depth, writes the mask.
/// 2. Composite: samples the mask, blends over the output in place.
#[must_use]
pub fn godray_stages() -> [Stage; 2] {
    [
        Stage {
            reads: &[StageBuffer::OutputColor, StageBuffer::Depth],
            writes: StageBuffer::Scratch(MASK_SCRATCH),
            kernel: Kernel::RayMarch,
        },
        Stage {
            reads: &[StageBuffer::Scratch(MASK_SCRATCH), StageBuffer::OutputColor],
            writes: StageBuffer::OutputColor,
            kernel: Kernel::Composite,
        },
    ]
}

/// Checks a stage sequence against the aliasing and read-after-write
/// rules. Must pass before the executor records anything.
pub fn validate_stages(stages: &[Stage]) -> Result<()> {
    let mut written: Vec<StageBuffer> = Vec::new();

    for (index, stage) in stages.iter().enumerate() {
        if stage.reads.contains(&stage.writes) && !stage.kernel.in_place_safe() {
            return Err(GodrayError::SelfAliasingStage { index });
        }

        // Scratch reads must be fed by an earlier stage this frame; the
        // output and depth buffers arrive populated from the host.
        for read in stage.reads {
            if matches!(read, StageBuffer::Scratch(_)) && !written.contains(read) {
                return Err(GodrayError::UnwrittenScratchRead { index });
            }
        }

        written.push(stage.writes);
    }

    Ok(())
}
