//! Parameter Derivation Tests
//!
//! Tests for:
//! - Inverse matrix round-trip laws over valid camera configurations
//! - Identity fallback + degraded flag for singular matrices
//! - Determinism of derivation
//! - Frame-local composition (`inverse(P * V)` vs `inv(V) * inv(P)`)

use glam::{Mat4, Vec3};

use godray::params::invert_camera;

const EPSILON: f32 = 1e-4;

fn mat_approx(a: Mat4, b: Mat4) -> bool {
    (0..4).all(|i| {
        let (ca, cb) = (a.col(i), b.col(i));
        (0..4).all(|j| (ca[j] - cb[j]).abs() < EPSILON)
    })
}

fn test_cameras() -> Vec<(Mat4, Mat4)> {
    let views = [
        Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y),
        Mat4::look_at_rh(Vec3::new(-3.0, 1.0, 4.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        Mat4::IDENTITY,
    ];
    let projections = [
        Mat4::perspective_rh(60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0),
        Mat4::perspective_rh(90.0_f32.to_radians(), 1.0, 0.5, 100.0),
        Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0),
    ];

    views
        .iter()
        .flat_map(|v| projections.iter().map(move |p| (*v, *p)))
        .collect()
}

// ============================================================================
// Round-Trip Laws
// ============================================================================

#[test]
fn inverse_projection_round_trips() {
    for (view, projection) in test_cameras() {
        let inverses = invert_camera(view, projection);
        assert!(!inverses.degraded);
        assert!(
            mat_approx(inverses.inverse_projection.inverse(), projection),
            "inverse(inverse_projection) should recover the projection"
        );
    }
}

#[test]
fn inverse_view_round_trips() {
    for (view, projection) in test_cameras() {
        let inverses = invert_camera(view, projection);
        assert!(
            mat_approx(inverses.inverse_view.inverse(), view),
            "inverse(inverse_view) should recover the view"
        );
    }
}

#[test]
fn inverse_view_projection_matches_composition() {
    for (view, projection) in test_cameras() {
        let inverses = invert_camera(view, projection);
        let recomposed = inverses.inverse_view * inverses.inverse_projection;
        assert!(
            mat_approx(inverses.inverse_view_projection, recomposed),
            "inverse(P * V) should equal inverse(V) * inverse(P)"
        );
    }
}

#[test]
fn unprojecting_ndc_origin_lands_between_planes() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
    let inverses = invert_camera(view, projection);

    let world = inverses.inverse_view_projection * glam::Vec4::new(0.0, 0.0, 0.5, 1.0);
    let world = world / world.w;
    let distance = (Vec3::new(world.x, world.y, world.z) - Vec3::new(0.0, 0.0, 5.0)).length();
    assert!(
        distance > 0.1 && distance < 100.0,
        "unprojected mid-depth point should sit between the clip planes, got {distance}"
    );
}

// ============================================================================
// Degraded Fallback
// ============================================================================

#[test]
fn singular_projection_degrades_to_identity() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y);
    let inverses = invert_camera(view, Mat4::ZERO);

    assert!(inverses.degraded);
    assert_eq!(inverses.inverse_projection, Mat4::IDENTITY);
    assert_eq!(inverses.inverse_view_projection, Mat4::IDENTITY);
    // The view itself was fine and still inverts.
    assert!(mat_approx(inverses.inverse_view.inverse(), view));
}

#[test]
fn non_finite_view_degrades() {
    let mut view = Mat4::IDENTITY;
    view.w_axis.x = f32::INFINITY;
    let projection = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);

    let inverses = invert_camera(view, projection);
    assert!(inverses.degraded);
    assert_eq!(inverses.inverse_view, Mat4::IDENTITY);
}

#[test]
fn near_equal_far_projection_degrades() {
    // A projection whose depth axis collapsed (near == far) loses a rank.
    let mut projection = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
    projection.z_axis = glam::Vec4::ZERO;

    let inverses = invert_camera(Mat4::IDENTITY, projection);
    assert!(inverses.degraded);
    assert_eq!(inverses.inverse_projection, Mat4::IDENTITY);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn derivation_is_deterministic() {
    let view = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(45.0_f32.to_radians(), 2.0, 0.25, 500.0);

    let a = invert_camera(view, projection);
    let b = invert_camera(view, projection);
    assert_eq!(a, b);
}
