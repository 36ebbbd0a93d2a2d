//! # godray
//!
//! A screen-space godray (light shaft) post-processing pass for wgpu
//! render pipelines.
//!
//! Each frame the pass derives inverse camera matrices and ray-march
//! constants from the host's [`FrameContext`], renders a shaft-intensity
//! mask into a downsampled scratch buffer, and alpha-blends the tinted
//! result back into the frame's color buffer, optionally publishing a
//! pre-composite snapshot of that buffer under a named slot for
//! downstream passes.
//!
//! ```rust,ignore
//! let mut pass = GodrayPass::new(&device, GodraySettings::default());
//! let mut blackboard = FrameBlackboard::new();
//!
//! // per frame, on the render thread:
//! if GodrayPass::should_enqueue(frame.camera, pass.settings()) {
//!     pass.setup(&device, &queue, &frame)?;
//!     let outcome = pass.execute(&frame, &mut blackboard, &mut encoder);
//! }
//!
//! // on teardown:
//! pass.dispose();
//! ```

pub mod errors;
pub mod executor;
pub mod frame;
pub mod params;
pub mod pass;
pub mod pool;
pub mod settings;
pub mod stage;
pub mod tracked;

pub use errors::{GodrayError, Result};
pub use executor::{GodrayExecutor, MASK_FORMAT};
pub use frame::{CameraKind, FrameBlackboard, FrameContext};
pub use params::{CameraInverses, DerivedParameters, GodrayUniforms, derive_parameters, invert_camera};
pub use pass::{GodrayPass, PassNode, RunOutcome, SkipReason};
pub use pool::{ScratchDesc, ScratchTexture, ScratchTexturePool, scaled_extent};
pub use settings::{GodraySettings, PassEvent, RenderLayers};
pub use stage::{Kernel, MASK_SCRATCH, SNAPSHOT_SCRATCH, Stage, StageBuffer, godray_stages, validate_stages};
pub use tracked::Tracked;
