use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use nalgebra::Vector3;
use ndarray::{Array2, Array3};
use parking_lot::Mutex;
use tracing::debug;

use super::{Capture, CaptureId, DepthDevice, DriverError, WaitResult};
use crate::{
    camera::{Calibration, CalibrationType, CameraCalibration},
    config::{ColorResolution, DepthMode, SessionConfig},
    image::{image_size, ColorImage, DepthImage, PointCloudImage, BGRA_CHANNELS},
    ray_table::to_i16_point,
    transform::Transform,
};

/// Produces the frame number `n` for a calibration.
pub type SceneFn = dyn Fn(u64, &Calibration) -> (DepthImage, ColorImage) + Send + Sync;

/// Outcome queued for the next call of `get_capture`.
#[derive(Debug)]
pub enum ScriptedCapture {
    Frame(DepthImage, ColorImage),
    DepthOnly(DepthImage),
    Timeout,
    Failure(String),
}

/// Software depth camera.
///
/// Behaves like a pinhole depth sensor rigidly attached to a pinhole color
/// sensor. Captures come from a queue of [`ScriptedCapture`]s and, once the
/// queue is empty, from a scene function (a flat wall at one meter unless
/// replaced with [`SyntheticDevice::with_scene`]).
///
/// Acquired captures are tracked, so a capture that is never released shows
/// up in [`SyntheticDevice::outstanding_captures`] and a double release
/// panics.
pub struct SyntheticDevice {
    installed: bool,
    fixed_calibration: Option<Calibration>,
    depth_hfov: f64,
    color_hfov: f64,
    depth_to_color: Transform,
    invalid_pixels: HashSet<(usize, usize)>,
    scene: Box<SceneFn>,
    frame_delay: Duration,

    fail_start: AtomicBool,
    fail_transforms: AtomicBool,
    started: AtomicBool,
    /// Drop captures missing an image, as requested by the session config.
    synchronized: AtomicBool,
    calibration: Mutex<Option<Calibration>>,
    script: Mutex<VecDeque<ScriptedCapture>>,
    live_captures: Mutex<HashSet<CaptureId>>,
    next_capture: AtomicU64,
    frame_count: AtomicU64,
}

impl Default for SyntheticDevice {
    fn default() -> Self {
        Self {
            installed: true,
            fixed_calibration: None,
            depth_hfov: 75.0,
            color_hfov: 90.0,
            depth_to_color: Transform::from_translation(-32.0, -2.0, 4.0),
            invalid_pixels: HashSet::new(),
            scene: Box::new(|_: u64, calibration: &Calibration| flat_wall(calibration, 1000)),
            frame_delay: Duration::ZERO,
            fail_start: AtomicBool::new(false),
            fail_transforms: AtomicBool::new(false),
            started: AtomicBool::new(false),
            synchronized: AtomicBool::new(true),
            calibration: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            live_captures: Mutex::new(HashSet::new()),
            next_capture: AtomicU64::new(1),
            frame_count: AtomicU64::new(0),
        }
    }
}

impl SyntheticDevice {
    /// A device that always reports this calibration, whatever modes are requested.
    pub fn with_calibration(calibration: Calibration) -> Self {
        Self {
            fixed_calibration: Some(calibration),
            ..Default::default()
        }
    }

    /// A system with no device plugged in.
    pub fn unplugged() -> Self {
        Self {
            installed: false,
            ..Default::default()
        }
    }

    /// Marks depth pixels, as (x, y), that lie outside the calibrated field of view.
    pub fn with_invalid_pixels<I: IntoIterator<Item = (usize, usize)>>(mut self, pixels: I) -> Self {
        self.invalid_pixels.extend(pixels);
        self
    }

    pub fn with_scene<F>(mut self, scene: F) -> Self
    where
        F: Fn(u64, &Calibration) -> (DepthImage, ColorImage) + Send + Sync + 'static,
    {
        self.scene = Box::new(scene);
        self
    }

    /// Sleeps this long on every successful capture, to mimic the camera frame rate.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn with_start_failure(self) -> Self {
        self.fail_start.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every projection primitive fail until turned off again.
    pub fn fail_transforms(&self, fail: bool) {
        self.fail_transforms.store(fail, Ordering::SeqCst);
    }

    pub fn push_capture(&self, capture: ScriptedCapture) {
        self.script.lock().push_back(capture);
    }

    /// Captures handed out and not yet released.
    pub fn outstanding_captures(&self) -> usize {
        self.live_captures.lock().len()
    }

    /// The calibration reported by the last `calibration` call.
    pub fn current_calibration(&self) -> Option<Calibration> {
        self.calibration.lock().clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn is_valid_depth_pixel(&self, calibration: &Calibration, x: usize, y: usize) -> bool {
        x < calibration.depth.width
            && y < calibration.depth.height
            && !self.invalid_pixels.contains(&(x, y))
    }

    fn check_transforms(&self) -> Result<(), DriverError> {
        if self.fail_transforms.load(Ordering::SeqCst) {
            Err(DriverError::new("transformation engine failure"))
        } else {
            Ok(())
        }
    }

    fn hand_out(&self, depth: Option<DepthImage>, color: Option<ColorImage>) -> Capture {
        let id = CaptureId(self.next_capture.fetch_add(1, Ordering::SeqCst));
        self.live_captures.lock().insert(id);
        Capture { id, depth, color }
    }

    /// Nearest color pixel seen by a valid depth pixel, if any.
    fn depth_pixel_in_color(
        &self,
        calibration: &Calibration,
        x: usize,
        y: usize,
        depth: u16,
    ) -> Option<(usize, usize, f32)> {
        if depth == 0 || !self.is_valid_depth_pixel(calibration, x, y) {
            return None;
        }
        let point = calibration
            .depth
            .intrinsics
            .backproject(x as f32, y as f32, depth as f32);
        let point = &calibration.depth_to_color * &point;
        if point[2] <= 0.0 {
            return None;
        }
        let (u, v) = calibration.color.intrinsics.project(&point);
        let (u, v) = (u.round(), v.round());
        if calibration.color.contains(u, v) {
            Some((u as usize, v as usize, point[2]))
        } else {
            None
        }
    }
}

fn check_size(
    what: &str,
    (width, height): (usize, usize),
    camera: &CameraCalibration,
) -> Result<(), DriverError> {
    if width != camera.width || height != camera.height {
        Err(DriverError::new(format!(
            "{what} is {width}x{height}, expected {}x{}",
            camera.width, camera.height
        )))
    } else {
        Ok(())
    }
}

/// A wall parallel to the sensor at `depth` millimeters, with a color ramp.
pub fn flat_wall(calibration: &Calibration, depth: u16) -> (DepthImage, ColorImage) {
    let depth_image = Array2::from_elem((calibration.depth.height, calibration.depth.width), depth);
    let color_image = Array3::from_shape_fn(
        (calibration.color.height, calibration.color.width, BGRA_CHANNELS),
        |(y, x, c)| match c {
            0 => (x % 256) as u8,
            1 => (y % 256) as u8,
            2 => 128,
            _ => 255,
        },
    );
    (depth_image, color_image)
}

impl DepthDevice for SyntheticDevice {
    fn installed_count(&self) -> u32 {
        u32::from(self.installed)
    }

    fn open(&self, index: u32) -> Result<(), DriverError> {
        if !self.installed || index != 0 {
            return Err(DriverError::new(format!("no device at index {index}")));
        }
        Ok(())
    }

    fn calibration(
        &self,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> Result<Calibration, DriverError> {
        let calibration = match &self.fixed_calibration {
            Some(calibration) => calibration.clone(),
            None => {
                let (depth_width, depth_height) = depth_mode.size();
                let (color_width, color_height) = color_resolution.size();
                Calibration::new(
                    CameraCalibration::from_fov(depth_width, depth_height, self.depth_hfov),
                    CameraCalibration::from_fov(color_width, color_height, self.color_hfov),
                    self.depth_to_color.clone(),
                )
            }
        };
        *self.calibration.lock() = Some(calibration.clone());
        Ok(calibration)
    }

    fn start_cameras(&self, config: &SessionConfig) -> Result<(), DriverError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(DriverError::new("camera stream refused to start"));
        }
        debug!(
            fps = config.camera_fps.hz(),
            synchronized = config.synchronized_images_only,
            "synthetic cameras started"
        );
        self.synchronized
            .store(config.synchronized_images_only, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_cameras(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn close(&self) {
        self.stop_cameras();
        *self.calibration.lock() = None;
    }

    fn get_capture(&self, _timeout: Duration) -> WaitResult<Capture> {
        if !self.is_started() {
            return WaitResult::Failed(DriverError::new("cameras are not running"));
        }
        let mut scripted = self.script.lock().pop_front();
        while let Some(ScriptedCapture::DepthOnly(_)) = scripted {
            if !self.synchronized.load(Ordering::SeqCst) {
                break;
            }
            debug!("capture without color image dropped");
            scripted = self.script.lock().pop_front();
        }
        match scripted {
            Some(ScriptedCapture::Timeout) => WaitResult::Timeout,
            Some(ScriptedCapture::Failure(message)) => WaitResult::Failed(DriverError::new(message)),
            Some(ScriptedCapture::DepthOnly(depth)) => {
                WaitResult::Succeeded(self.hand_out(Some(depth), None))
            }
            Some(ScriptedCapture::Frame(depth, color)) => {
                WaitResult::Succeeded(self.hand_out(Some(depth), Some(color)))
            }
            None => {
                let calibration = match self.current_calibration() {
                    Some(calibration) => calibration,
                    None => return WaitResult::Failed(DriverError::new("device not calibrated")),
                };
                if !self.frame_delay.is_zero() {
                    std::thread::sleep(self.frame_delay);
                }
                let n = self.frame_count.fetch_add(1, Ordering::SeqCst);
                let (depth, color) = (self.scene)(n, &calibration);
                WaitResult::Succeeded(self.hand_out(Some(depth), Some(color)))
            }
        }
    }

    fn release_capture(&self, id: CaptureId) {
        if !self.live_captures.lock().remove(&id) {
            panic!("capture {} released twice or never acquired", id.0);
        }
    }

    fn unproject(
        &self,
        calibration: &Calibration,
        pixel: (f32, f32),
        depth: f32,
        source: CalibrationType,
        target: CalibrationType,
    ) -> Option<Vector3<f32>> {
        let camera = calibration.camera(source);
        let (x, y) = pixel;
        if !camera.contains(x, y) {
            return None;
        }
        if source == CalibrationType::Depth
            && !self.is_valid_depth_pixel(calibration, x as usize, y as usize)
        {
            return None;
        }
        let point = camera.intrinsics.backproject(x, y, depth);
        Some(&calibration.extrinsics(source, target) * &point)
    }

    fn depth_image_to_point_cloud(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        camera: CalibrationType,
        point_cloud: &mut PointCloudImage,
    ) -> Result<(), DriverError> {
        self.check_transforms()?;
        let camera_calibration = calibration.camera(camera);
        check_size("depth image", image_size(depth), camera_calibration)?;
        check_size("point cloud image", image_size(point_cloud), camera_calibration)?;

        for ((y, x), z) in depth.indexed_iter() {
            let valid = *z != 0
                && (camera == CalibrationType::Color
                    || self.is_valid_depth_pixel(calibration, x, y));
            let xyz = if valid {
                let point = camera_calibration
                    .intrinsics
                    .backproject(x as f32, y as f32, *z as f32);
                to_i16_point(point[0], point[1], point[2]).unwrap_or([0; 3])
            } else {
                [0; 3]
            };
            for c in 0..3 {
                point_cloud[[y, x, c]] = xyz[c];
            }
        }
        Ok(())
    }

    fn color_image_to_depth_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        color: &ColorImage,
        transformed_color: &mut ColorImage,
    ) -> Result<(), DriverError> {
        self.check_transforms()?;
        check_size("depth image", image_size(depth), &calibration.depth)?;
        check_size("color image", image_size(color), &calibration.color)?;
        check_size("transformed color image", image_size(transformed_color), &calibration.depth)?;

        transformed_color.fill(0);
        for ((y, x), z) in depth.indexed_iter() {
            if let Some((u, v, _)) = self.depth_pixel_in_color(calibration, x, y, *z) {
                for c in 0..BGRA_CHANNELS {
                    transformed_color[[y, x, c]] = color[[v, u, c]];
                }
            }
        }
        Ok(())
    }

    fn depth_image_to_color_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        transformed_depth: &mut DepthImage,
    ) -> Result<(), DriverError> {
        self.check_transforms()?;
        check_size("depth image", image_size(depth), &calibration.depth)?;
        check_size("transformed depth image", image_size(transformed_depth), &calibration.color)?;

        transformed_depth.fill(0);
        for ((y, x), z) in depth.indexed_iter() {
            if let Some((u, v, color_z)) = self.depth_pixel_in_color(calibration, x, y, *z) {
                let color_z = color_z.round().clamp(1.0, u16::MAX as f32) as u16;
                let current = &mut transformed_depth[[v, u]];
                if *current == 0 || color_z < *current {
                    *current = color_z;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ndarray::{Array2, Array3};
    use rstest::rstest;

    use super::{flat_wall, ScriptedCapture, SyntheticDevice};
    use crate::{
        camera::{Calibration, CalibrationType},
        config::{ColorResolution, DepthMode, SessionConfig},
        device::{DepthDevice, WaitResult},
        unit_test::{identity_calibration, started_device},
    };

    #[rstest]
    fn should_follow_script_then_scene(identity_calibration: Calibration) {
        let device = started_device(identity_calibration);
        device.push_capture(ScriptedCapture::Timeout);
        device.push_capture(ScriptedCapture::Failure("usb reset".to_string()));

        assert!(matches!(
            device.get_capture(Duration::from_millis(1)),
            WaitResult::Timeout
        ));
        assert!(matches!(
            device.get_capture(Duration::from_millis(1)),
            WaitResult::Failed(err) if err.message == "usb reset"
        ));
        match device.get_capture(Duration::from_millis(1)) {
            WaitResult::Succeeded(capture) => {
                assert!(capture.depth.unwrap().iter().all(|d| *d == 1000));
                device.release_capture(capture.id);
            }
            other => panic!("unexpected capture result {other:?}"),
        }
        assert_eq!(device.outstanding_captures(), 0);
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    fn should_deliver_incomplete_captures_only_when_unsynchronized(
        identity_calibration: Calibration,
        #[case] synchronized: bool,
        #[case] delivered: bool,
    ) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        device
            .calibration(DepthMode::NfovUnbinned, ColorResolution::R720p)
            .unwrap();
        device
            .start_cameras(&SessionConfig::default().synchronized_images_only(synchronized))
            .unwrap();
        device.push_capture(ScriptedCapture::DepthOnly(Array2::zeros((4, 4))));
        device.push_capture(ScriptedCapture::DepthOnly(Array2::zeros((4, 4))));

        match device.get_capture(Duration::from_millis(1)) {
            WaitResult::Succeeded(capture) => {
                assert_eq!(capture.color.is_none(), delivered);
                device.release_capture(capture.id);
            }
            other => panic!("unexpected capture result {other:?}"),
        }
    }

    #[test]
    fn should_refuse_captures_before_start() {
        let device = SyntheticDevice::default();
        assert!(matches!(
            device.get_capture(Duration::from_millis(1)),
            WaitResult::Failed(_)
        ));
    }

    #[test]
    fn should_calibrate_from_modes() {
        let device = SyntheticDevice::default();
        let calibration = device
            .calibration(DepthMode::NfovBinned, ColorResolution::R1080p)
            .unwrap();
        assert_eq!((calibration.depth.width, calibration.depth.height), (320, 288));
        assert_eq!((calibration.color.width, calibration.color.height), (1920, 1080));
    }

    #[rstest]
    fn should_mark_invalid_pixels(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone())
            .with_invalid_pixels([(1, 2)]);
        assert!(device
            .unproject(&identity_calibration, (1.0, 2.0), 1.0, CalibrationType::Depth, CalibrationType::Depth)
            .is_none());
        assert!(device
            .unproject(&identity_calibration, (2.0, 2.0), 1.0, CalibrationType::Depth, CalibrationType::Depth)
            .is_some());
        assert!(device
            .unproject(&identity_calibration, (9.0, 2.0), 1.0, CalibrationType::Depth, CalibrationType::Depth)
            .is_none());
    }

    #[rstest]
    fn should_resample_between_grids(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        let (depth, color) = flat_wall(&identity_calibration, 800);

        let mut transformed_depth =
            Array2::<u16>::zeros((identity_calibration.color.height, identity_calibration.color.width));
        device
            .depth_image_to_color_camera(&identity_calibration, &depth, &mut transformed_depth)
            .unwrap();
        assert!(transformed_depth.iter().any(|z| *z == 800));
        assert!(transformed_depth.iter().all(|z| *z == 0 || *z == 800));

        let mut transformed_color =
            Array3::<u8>::zeros((identity_calibration.depth.height, identity_calibration.depth.width, 4));
        device
            .color_image_to_depth_camera(&identity_calibration, &depth, &color, &mut transformed_color)
            .unwrap();
        assert!(transformed_color
            .lanes(ndarray::Axis(2))
            .into_iter()
            .all(|bgra| bgra[3] == 255 && bgra[2] == 128));
    }

    #[rstest]
    fn should_reject_mismatched_buffers(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        let (depth, _) = flat_wall(&identity_calibration, 800);
        let mut point_cloud = Array3::<i16>::zeros((1, 1, 3));
        assert!(device
            .depth_image_to_point_cloud(&identity_calibration, &depth, CalibrationType::Depth, &mut point_cloud)
            .is_err());

        device.fail_transforms(true);
        let mut point_cloud = Array3::<i16>::zeros((
            identity_calibration.depth.height,
            identity_calibration.depth.width,
            3,
        ));
        assert!(device
            .depth_image_to_point_cloud(&identity_calibration, &depth, CalibrationType::Depth, &mut point_cloud)
            .is_err());
    }
}
