//! Godray Pass Lifecycle
//!
//! [`GodrayPass`] is the single concrete pass type the host drives through
//! three lifecycle methods: once-per-frame [`setup`](GodrayPass::setup),
//! [`execute`](GodrayPass::execute), and terminal
//! [`dispose`](GodrayPass::dispose):
//!
//! ```text
//! Configured ──setup──► Ready(Setup) ──execute──► Ready(Executed)
//!     ▲                      │                         │
//!     └──── new(device) ─────┘      next frame: setup ─┘
//!                                              dispose ──► Disposed (terminal)
//! ```
//!
//! Per-frame failures (degenerate viewport, non-invertible camera,
//! missing scratch surface) degrade to a skipped frame with the output
//! buffer untouched. The only hard error is driving a disposed pass.
//!
//! # All-or-nothing recording
//!
//! `execute` validates the stage sequence, the scratch allocations, and
//! the pipeline set *before* recording anything; a frame either records
//! the full march → publish → composite sequence or records nothing.

use crate::errors::{GodrayError, Result};
use crate::executor::{GodrayExecutor, MASK_FORMAT};
use crate::frame::{CameraKind, FrameBlackboard, FrameContext};
use crate::params::derive_parameters;
use crate::pool::{ScratchDesc, ScratchTexturePool, scaled_extent};
use crate::settings::{GodraySettings, PassEvent};
use crate::stage::{MASK_SCRATCH, SNAPSHOT_SCRATCH, godray_stages, validate_stages};

// ─── Outcomes ─────────────────────────────────────────────────────────────────

/// Why a frame's effect was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The pass is scheduled at the frame's terminal event; running it
    /// there is a deliberate no-op.
    TerminalEvent,
    /// The viewport resolved to zero pixels in at least one dimension.
    DegenerateViewport,
    /// A required buffer (scratch mask or publication snapshot) could not
    /// be provided.
    UnavailableResource,
    /// A camera matrix was not invertible this frame; identity fallbacks
    /// were derived and the effect withheld.
    DegradedParameters,
    /// A required pipeline or bind group is absent.
    MissingKernel,
    /// `execute` was called without a matching `setup` this frame.
    NotPrepared,
    /// The stage sequence failed validation.
    InvalidStageSequence,
}

/// Result of one frame's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All stages were recorded and the output buffer was updated.
    Rendered,
    /// Nothing was recorded; the output buffer is untouched.
    Skipped(SkipReason),
}

// ─── Internal State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Setup,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Configured,
    Ready(FramePhase),
    Disposed,
}

/// Decisions made during setup, consumed by execute.
struct FramePlan {
    skip: Option<SkipReason>,
    clear_mask: bool,
    publish: Option<String>,
}

// ─── Host Interface ───────────────────────────────────────────────────────────

/// Lifecycle interface the host pipeline drives through virtual dispatch.
///
/// There is exactly one behavioral variant ([`GodrayPass`]), so the trait
/// exists for the host's benefit: a render graph can hold
/// `Box<dyn PassNode>` alongside its other passes without knowing the
/// concrete type.
pub trait PassNode {
    /// Node name for debugging and profiling.
    fn name(&self) -> &str;

    /// Once-per-frame resource preparation. See [`GodrayPass::setup`].
    fn setup(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameContext<'_>,
    ) -> Result<()>;

    /// Records the frame's commands. See [`GodrayPass::execute`].
    fn execute(
        &mut self,
        frame: &FrameContext<'_>,
        blackboard: &mut FrameBlackboard,
        encoder: &mut wgpu::CommandEncoder,
    ) -> RunOutcome;

    /// Terminal teardown. See [`GodrayPass::dispose`].
    fn dispose(&mut self);
}

// ─── Pass ─────────────────────────────────────────────────────────────────────

/// The screen-space godray post-processing pass.
pub struct GodrayPass {
    state: PassState,
    settings: GodraySettings,
    /// Clamped copy of `settings` taken at this frame's setup, so host
    /// edits mid-frame cannot tear the parameters.
    snapshot: GodraySettings,
    pool: ScratchTexturePool,
    executor: GodrayExecutor,
    plan: FramePlan,
}

impl GodrayPass {
    /// Creates a configured pass. GPU layouts, samplers, and the uniform
    /// buffer are allocated here; pipelines follow lazily at first setup.
    #[must_use]
    pub fn new(device: &wgpu::Device, settings: GodraySettings) -> Self {
        Self {
            state: PassState::Configured,
            snapshot: settings.clamped(),
            settings,
            pool: ScratchTexturePool::new(),
            executor: GodrayExecutor::new(device),
            plan: FramePlan {
                skip: Some(SkipReason::NotPrepared),
                clear_mask: false,
                publish: None,
            },
        }
    }

    /// Scheduler contract: whether the pass should be enqueued for a
    /// camera at all. Preview cameras never receive the effect, and
    /// scene-view cameras only when the settings opt in. The pass itself
    /// is safe to simply not be invoked.
    #[must_use]
    pub fn should_enqueue(camera: CameraKind, settings: &GodraySettings) -> bool {
        match camera {
            CameraKind::Preview => false,
            CameraKind::SceneView => settings.show_in_scene_view,
            CameraKind::Game => true,
        }
    }

    /// Host-editable configuration. Edits take effect at the next setup.
    #[must_use]
    pub fn settings(&self) -> &GodraySettings {
        &self.settings
    }

    /// Mutable access to the configuration.
    pub fn settings_mut(&mut self) -> &mut GodraySettings {
        &mut self.settings
    }

    /// Read access to the scratch pool, e.g. for allocation accounting.
    #[must_use]
    pub fn pool(&self) -> &ScratchTexturePool {
        &self.pool
    }

    /// Whether the pass has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state == PassState::Disposed
    }

    // =========================================================================
    // Lifecycle: Setup
    // =========================================================================

    /// Per-frame setup: snapshots the settings, sizes the scratch
    /// buffers against the current viewport, derives the frame's
    /// parameters, and uploads uniforms.
    ///
    /// # Errors
    ///
    /// [`GodrayError::PassDisposed`] when called after [`dispose`](Self::dispose).
    /// Every other problem is recorded as a skip decision and surfaces
    /// through [`execute`](Self::execute).
    pub fn setup(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameContext<'_>,
    ) -> Result<()> {
        if self.state == PassState::Disposed {
            return Err(GodrayError::PassDisposed);
        }
        self.state = PassState::Ready(FramePhase::Setup);

        self.snapshot = self.settings.clamped();
        self.plan = FramePlan {
            skip: None,
            clear_mask: self.snapshot.clear_target,
            publish: self.snapshot.color_target_id.clone(),
        };

        // Scheduled past the last meaningful input: deliberate no-op.
        if self.snapshot.pass_event == PassEvent::AfterRendering {
            self.plan.skip = Some(SkipReason::TerminalEvent);
            return Ok(());
        }

        let Some((mask_w, mask_h)) = scaled_extent(frame.viewport, self.snapshot.downscale_factor)
        else {
            self.plan.skip = Some(SkipReason::DegenerateViewport);
            return Ok(());
        };

        // Matrices are captured for this frame only; a failed inversion
        // withholds the effect instead of feeding the kernel garbage.
        let derived = derive_parameters(frame, &self.snapshot);
        if derived.degraded {
            log::warn!("godray: camera matrices not invertible, skipping frame");
            self.plan.skip = Some(SkipReason::DegradedParameters);
            return Ok(());
        }

        if self
            .pool
            .ensure_sized(
                device,
                MASK_SCRATCH,
                ScratchDesc::color(mask_w, mask_h, MASK_FORMAT, "Godray Mask"),
            )
            .is_none()
        {
            self.plan.skip = Some(SkipReason::UnavailableResource);
            return Ok(());
        }

        // The publication snapshot is always full resolution, regardless
        // of the mask's downscale factor.
        if self.plan.publish.is_some()
            && self
                .pool
                .ensure_sized(
                    device,
                    SNAPSHOT_SCRATCH,
                    ScratchDesc {
                        width: frame.viewport.0,
                        height: frame.viewport.1,
                        format: frame.color_format,
                        usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
                        label: "Godray Color Snapshot",
                    },
                )
                .is_none()
        {
            self.plan.skip = Some(SkipReason::UnavailableResource);
            return Ok(());
        }

        self.executor.ensure_pipelines(device, frame.color_format);
        self.executor.write_uniforms(queue, &derived.uniforms);
        self.executor
            .prepare_march_bind_group(device, frame.color_view, frame.depth_view);

        let mask_view = self
            .pool
            .get(MASK_SCRATCH)
            .map(|scratch| scratch.view().clone());
        if let Some(mask_view) = mask_view {
            self.executor.prepare_composite_bind_group(device, &mask_view);
        }

        Ok(())
    }

    // =========================================================================
    // Lifecycle: Execute
    // =========================================================================

    /// Records this frame's stages into the host's encoder, in strict
    /// sequence: ray march, optional publication, composite. Returns
    /// [`RunOutcome::Skipped`] with nothing recorded when any precondition
    /// fails.
    pub fn execute(
        &mut self,
        frame: &FrameContext<'_>,
        blackboard: &mut FrameBlackboard,
        encoder: &mut wgpu::CommandEncoder,
    ) -> RunOutcome {
        if self.state != PassState::Ready(FramePhase::Setup) {
            return RunOutcome::Skipped(SkipReason::NotPrepared);
        }
        self.state = PassState::Ready(FramePhase::Executed);

        if let Some(reason) = self.plan.skip {
            return RunOutcome::Skipped(reason);
        }

        // ── Validate everything before the first command ──────────────────
        let stages = godray_stages();
        if let Err(err) = validate_stages(&stages) {
            log::error!("godray: rejected stage sequence: {err}");
            return RunOutcome::Skipped(SkipReason::InvalidStageSequence);
        }

        let Some(mask) = self.pool.get(MASK_SCRATCH) else {
            return RunOutcome::Skipped(SkipReason::UnavailableResource);
        };

        let snapshot = match &self.plan.publish {
            Some(_) => match self.pool.get(SNAPSHOT_SCRATCH) {
                Some(snapshot) => Some(snapshot),
                None => return RunOutcome::Skipped(SkipReason::UnavailableResource),
            },
            None => None,
        };

        if !self.executor.ready(frame.color_format) {
            return RunOutcome::Skipped(SkipReason::MissingKernel);
        }

        // ── Record: march → publish → composite ───────────────────────────
        self.executor
            .record_march(encoder, mask.view(), self.plan.clear_mask);

        if let (Some(name), Some(snapshot)) = (&self.plan.publish, snapshot) {
            self.executor
                .record_snapshot_copy(encoder, frame.color_view.texture(), snapshot);
            blackboard.publish(name, snapshot.view().clone());
        }

        self.executor
            .record_composite(encoder, frame.color_view, frame.color_format);

        RunOutcome::Rendered
    }

    /// Convenience scope for hosts without their own encoder: creates a
    /// command encoder, runs [`execute`](Self::execute), and always
    /// submits, including on skip paths, so no partially recorded
    /// encoder outlives the frame.
    pub fn encode_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameContext<'_>,
        blackboard: &mut FrameBlackboard,
    ) -> Result<RunOutcome> {
        self.setup(device, queue, frame)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Godray Encoder"),
        });
        let outcome = self.execute(frame, blackboard, &mut encoder);
        queue.submit(std::iter::once(encoder.finish()));

        Ok(outcome)
    }

    // =========================================================================
    // Lifecycle: Dispose
    // =========================================================================

    /// Releases every scratch surface and retires the pass. Terminal and
    /// idempotent; any later `setup` is an error.
    pub fn dispose(&mut self) {
        self.pool.release_all();
        self.state = PassState::Disposed;
    }
}

impl PassNode for GodrayPass {
    fn name(&self) -> &str {
        "Godray Pass"
    }

    fn setup(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameContext<'_>,
    ) -> Result<()> {
        GodrayPass::setup(self, device, queue, frame)
    }

    fn execute(
        &mut self,
        frame: &FrameContext<'_>,
        blackboard: &mut FrameBlackboard,
        encoder: &mut wgpu::CommandEncoder,
    ) -> RunOutcome {
        GodrayPass::execute(self, frame, blackboard, encoder)
    }

    fn dispose(&mut self) {
        GodrayPass::dispose(self);
    }
}
