use std::time::Duration;

use kinect_context::{
    camera::{Calibration, CameraCalibration},
    construct::construct,
    device::{flat_wall, ScriptedCapture, SyntheticDevice},
    io::{write_context_ply, write_ply},
    transform::Transform,
    ErrorKind, KinectError, KinectSession, SessionConfig, SpatialBounds, TransformMode,
};
use nalgebra::Vector3;
use ndarray::Array3;
use rstest::{fixture, rstest};

#[fixture]
fn calibration() -> Calibration {
    Calibration::new(
        CameraCalibration::from_fov(64, 48, 75.0),
        CameraCalibration::from_fov(128, 72, 90.0),
        Transform::from_translation(-32.0, -2.0, 4.0),
    )
}

fn open_session(calibration: Calibration) -> KinectSession<SyntheticDevice> {
    KinectSession::open(
        SyntheticDevice::with_calibration(calibration),
        SessionConfig::default().capture_timeout_ms(20),
    )
    .unwrap()
}

#[rstest]
fn should_record_both_grids(calibration: Calibration) {
    let session = open_session(calibration);

    session.record(TransformMode::DepthSpace).unwrap();
    assert_eq!(session.num_points(), 64 * 48);
    assert_eq!(session.full_cloud().valid_count(), 64 * 48);
    assert!(session.full_cloud().iter_valid().all(|(p, _)| p[2] == 1000.0));

    session.record(TransformMode::ColorSpace).unwrap();
    let clouds = session.clouds();
    assert_eq!(clouds.num_points(), 128 * 72);
    assert_eq!(clouds.full.points.dim(), (128 * 72, 3));
    assert_eq!(clouds.context.colors.dim(), (128 * 72, 3));
    // The narrower depth camera does not cover the whole color grid.
    assert!(clouds.full.valid_count() > 0);
    assert!(clouds.full.valid_count() < clouds.num_points());
}

#[rstest]
fn should_leave_clouds_bit_identical_after_timeout(calibration: Calibration) {
    let session = open_session(calibration);
    session
        .set_bounds(Vector3::new(-200.0, -200.0, 0.0), Vector3::new(200.0, 200.0, 5000.0))
        .unwrap();
    session.record(TransformMode::DepthSpace).unwrap();
    let full = session.full_cloud().clone();
    let context = session.context().clone();

    session.device().push_capture(ScriptedCapture::Timeout);
    let err = session.record(TransformMode::DepthSpace).unwrap_err();
    assert!(matches!(err, KinectError::CaptureTimeout));
    assert_eq!(err.kind(), ErrorKind::Retryable);

    assert_eq!(*session.full_cloud(), full);
    assert_eq!(*session.context(), context);
    assert_eq!(session.device().outstanding_captures(), 0);
}

#[rstest]
fn should_apply_bounds_from_next_cycle(calibration: Calibration) {
    let session = open_session(calibration);
    session.record(TransformMode::DepthSpace).unwrap();
    assert_eq!(*session.full_cloud(), *session.context());

    let lower = Vector3::new(-100.0, -100.0, 900.0);
    let upper = Vector3::new(100.0, 100.0, 1100.0);
    session.set_bounds(lower, upper).unwrap();
    // Already published clouds are not rebuilt.
    assert_eq!(*session.full_cloud(), *session.context());

    session.record(TransformMode::DepthSpace).unwrap();
    let bounds = SpatialBounds::new(lower, upper);
    let clouds = session.clouds();
    let inside = clouds.full.iter_valid().filter(|(p, _)| bounds.contains(p)).count();
    assert!(inside > 0);
    assert_eq!(clouds.context.valid_count(), inside);
    assert!(clouds.context.iter_valid().all(|(p, _)| bounds.contains(&p)));
}

#[rstest]
fn should_match_direct_construction(calibration: Calibration) {
    let session = open_session(calibration.clone());
    let (depth, color) = flat_wall(&calibration, 1500);
    session.device().push_capture(ScriptedCapture::Frame(depth.clone(), color));
    session.record(TransformMode::DepthSpace).unwrap();

    let mut point_cloud = Array3::<i16>::zeros((48, 64, 3));
    session
        .ray_table()
        .depth_to_point_cloud(&depth, &mut point_cloud)
        .unwrap();
    let direct = construct(&point_cloud, &Array3::zeros((48, 64, 4)), &SpatialBounds::default()).unwrap();

    let full = session.full_cloud();
    assert_eq!(direct.full.points, full.points);
    for (i, (y, x)) in itertools::iproduct!(0..48, 0..64).enumerate() {
        assert_eq!(full.point(i)[2], point_cloud[[y, x, 2]] as f32);
    }
}

#[rstest]
fn should_export_clouds(calibration: Calibration) {
    let session = open_session(calibration);
    session
        .set_bounds(Vector3::new(f32::MIN, f32::MIN, 0.0), Vector3::new(0.0, f32::MAX, 5000.0))
        .unwrap();
    session.record(TransformMode::DepthSpace).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let clouds = session.clouds();
    write_ply(dir.path().join("context.ply"), &clouds.context).unwrap();
    write_context_ply(dir.path().join("highlight.ply"), &clouds.full, &clouds.context).unwrap();

    let context = std::fs::read_to_string(dir.path().join("context.ply")).unwrap();
    assert!(context.starts_with("ply\nformat ascii 1.0\n"));
    assert!(context.contains(&format!("element vertex {}\n", clouds.context.valid_count())));

    let highlight = std::fs::read_to_string(dir.path().join("highlight.ply")).unwrap();
    assert!(highlight.contains(&format!("element vertex {}\n", clouds.full.valid_count())));
    let highlighted = highlight
        .lines()
        .filter(|line| line.trim_end().ends_with(" 174 1 126"))
        .count();
    assert_eq!(highlighted, clouds.context.valid_count());
}

#[test]
fn should_survive_slow_frames() {
    let session = KinectSession::open(
        SyntheticDevice::default().with_frame_delay(Duration::from_millis(2)),
        SessionConfig::default(),
    )
    .unwrap();
    for cycle in 1..=3 {
        assert_eq!(session.record(TransformMode::DepthSpace).unwrap(), cycle);
    }
}
