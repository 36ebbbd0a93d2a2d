//! Pass Lifecycle and End-to-End Tests
//!
//! Scenario coverage:
//! - A: 1920×1080 at 0.5 downscale → 960×540 mask, in-place output, no
//!   published target
//! - B: `color_target_id = "_GodrayColor"` → snapshot published exactly
//!   once, at full resolution, before the blend overwrites the output
//! - D: singular projection → degraded-parameters skip, nothing recorded
//! - Degenerate viewport, terminal pass event, lifecycle transitions
//!
//! GPU-backed tests skip silently on machines without an adapter.

use glam::{Mat4, Vec3};

use godray::errors::GodrayError;
use godray::frame::{CameraKind, FrameBlackboard, FrameContext};
use godray::pass::{GodrayPass, RunOutcome, SkipReason};
use godray::settings::{GodraySettings, PassEvent};
use godray::stage::{MASK_SCRATCH, SNAPSHOT_SCRATCH};
use godray::tracked::Tracked;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn create_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    let _ = env_logger::builder().is_test(true).try_init();

    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;

    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("godray pass test device"),
        ..Default::default()
    }))
    .ok()
}

/// Host-side stand-ins for the frame's color and depth targets.
struct FrameTargets {
    color_view: Tracked<wgpu::TextureView>,
    depth_view: Tracked<wgpu::TextureView>,
}

impl FrameTargets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test color target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test depth target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        Self {
            color_view: Tracked::new(color.create_view(&wgpu::TextureViewDescriptor::default())),
            depth_view: Tracked::new(depth.create_view(&wgpu::TextureViewDescriptor::default())),
        }
    }

    fn frame(&self, width: u32, height: u32) -> FrameContext<'_> {
        FrameContext {
            viewport: (width, height),
            projection: Mat4::perspective_rh(60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0),
            view: Mat4::look_at_rh(Vec3::new(0.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y),
            color_view: &self.color_view,
            color_format: COLOR_FORMAT,
            depth_view: &self.depth_view,
            camera: CameraKind::Game,
        }
    }
}

// ============================================================================
// Scenario A: downsampled mask, in-place output, nothing published
// ============================================================================

#[test]
fn scenario_downsampled_mask_without_publication() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 1920, 1080);
    let frame = targets.frame(1920, 1080);

    let mut pass = GodrayPass::new(
        &device,
        GodraySettings {
            downscale_factor: 0.5,
            color_target_id: Some(String::new()), // empty id: publish nothing
            ..GodraySettings::default()
        },
    );
    let mut blackboard = FrameBlackboard::new();

    let outcome = pass
        .encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");

    assert_eq!(outcome, RunOutcome::Rendered);
    assert!(blackboard.is_empty(), "empty id must publish nothing");

    let mask = pass.pool().get(MASK_SCRATCH).expect("mask allocated");
    assert_eq!((mask.desc().width, mask.desc().height), (960, 540));
    assert!(pass.pool().get(SNAPSHOT_SCRATCH).is_none());
}

// ============================================================================
// Scenario B: named publication before the blend
// ============================================================================

#[test]
fn scenario_publishes_precomposite_color_once() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 640, 360);
    let frame = targets.frame(640, 360);

    let mut pass = GodrayPass::new(
        &device,
        GodraySettings {
            downscale_factor: 0.5,
            color_target_id: Some("_GodrayColor".to_owned()),
            ..GodraySettings::default()
        },
    );
    let mut blackboard = FrameBlackboard::new();

    let outcome = pass
        .encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");

    assert_eq!(outcome, RunOutcome::Rendered);
    assert_eq!(blackboard.len(), 1, "published exactly once");
    assert!(blackboard.get("_GodrayColor").is_some());

    // The snapshot is full resolution regardless of the mask downscale.
    let snapshot = pass.pool().get(SNAPSHOT_SCRATCH).expect("snapshot allocated");
    assert_eq!((snapshot.desc().width, snapshot.desc().height), (640, 360));
    assert_eq!(snapshot.desc().format, COLOR_FORMAT);
}

// ============================================================================
// Scenario D: degraded parameters
// ============================================================================

#[test]
fn scenario_singular_projection_skips_frame() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 256, 256);
    let mut frame = targets.frame(256, 256);
    frame.projection = Mat4::ZERO;

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    let mut blackboard = FrameBlackboard::new();

    let outcome = pass
        .encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::DegradedParameters));
    assert_eq!(
        pass.pool().allocation_count(),
        0,
        "a skipped frame must not allocate"
    );
    assert!(blackboard.is_empty());
}

// ============================================================================
// Degenerate viewport & terminal scheduling
// ============================================================================

#[test]
fn zero_viewport_skips_without_allocating() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 64, 64);
    let mut frame = targets.frame(64, 64);
    frame.viewport = (0, 1080);

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    let mut blackboard = FrameBlackboard::new();

    let outcome = pass
        .encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::DegenerateViewport));
    assert_eq!(pass.pool().allocation_count(), 0);
}

#[test]
fn terminal_pass_event_is_a_noop() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 64, 64);
    let frame = targets.frame(64, 64);

    let mut pass = GodrayPass::new(
        &device,
        GodraySettings {
            pass_event: PassEvent::AfterRendering,
            ..GodraySettings::default()
        },
    );
    let mut blackboard = FrameBlackboard::new();

    let outcome = pass
        .encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::TerminalEvent));
    assert_eq!(pass.pool().allocation_count(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn stable_viewport_never_reallocates() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 320, 240);
    let frame = targets.frame(320, 240);

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    let mut blackboard = FrameBlackboard::new();

    for _ in 0..4 {
        blackboard.clear();
        let outcome = pass
            .encode_frame(&device, &queue, &frame, &mut blackboard)
            .expect("pass is not disposed");
        assert_eq!(outcome, RunOutcome::Rendered);
    }
    assert_eq!(pass.pool().allocation_count(), 1);
}

#[test]
fn viewport_change_reallocates_only_affected_buffers() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let mut pass = GodrayPass::new(
        &device,
        GodraySettings {
            color_target_id: Some("_GodrayColor".to_owned()),
            ..GodraySettings::default()
        },
    );
    let mut blackboard = FrameBlackboard::new();

    let targets = FrameTargets::new(&device, 320, 240);
    pass.encode_frame(&device, &queue, &targets.frame(320, 240), &mut blackboard)
        .expect("pass is not disposed");
    assert_eq!(pass.pool().allocation_count(), 2); // mask + snapshot

    // Shrinking only the mask (snapshot stays at viewport resolution).
    blackboard.clear();
    pass.settings_mut().downscale_factor = 0.25;
    pass.encode_frame(&device, &queue, &targets.frame(320, 240), &mut blackboard)
        .expect("pass is not disposed");
    assert_eq!(
        pass.pool().allocation_count(),
        3,
        "only the mask should have been reallocated"
    );
    let snapshot = pass.pool().get(SNAPSHOT_SCRATCH).expect("snapshot kept");
    assert_eq!(snapshot.desc().width, 320);
}

#[test]
fn execute_without_setup_is_skipped() {
    let Some((device, _queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 64, 64);
    let frame = targets.frame(64, 64);

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    let mut blackboard = FrameBlackboard::new();
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());

    let outcome = pass.execute(&frame, &mut blackboard, &mut encoder);
    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NotPrepared));
    drop(encoder.finish());
}

#[test]
fn disposed_pass_rejects_setup() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 64, 64);
    let frame = targets.frame(64, 64);

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    pass.dispose();
    assert!(pass.is_disposed());
    assert!(pass.pool().is_empty());

    // Dispose is idempotent.
    pass.dispose();
    assert!(pass.is_disposed());

    assert_eq!(
        pass.setup(&device, &queue, &frame),
        Err(GodrayError::PassDisposed)
    );
}

#[test]
fn dispose_releases_scratch_buffers() {
    let Some((device, queue)) = create_device_queue() else {
        eprintln!("Skipping pass test: no adapter");
        return;
    };

    let targets = FrameTargets::new(&device, 128, 128);
    let frame = targets.frame(128, 128);

    let mut pass = GodrayPass::new(&device, GodraySettings::default());
    let mut blackboard = FrameBlackboard::new();
    pass.encode_frame(&device, &queue, &frame, &mut blackboard)
        .expect("pass is not disposed");
    assert!(!pass.pool().is_empty());

    pass.dispose();
    assert!(pass.pool().is_empty());
}
