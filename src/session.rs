use std::time::Instant;

use nalgebra::Vector3;
use parking_lot::MappedRwLockReadGuard;
use tracing::{debug, error, info, warn};

use crate::{
    bounds::SpatialBounds,
    camera::Calibration,
    capture::capture,
    config::SessionConfig,
    construct::{construct_into, Clouds},
    device::DepthDevice,
    error::KinectError,
    pointcloud::PointCloud,
    ray_table::RayTable,
    store::ContextStore,
    transformer::{transform, TransformMode},
};

/// An opened and streaming depth camera together with its context store.
///
/// Share it with `Arc`: one thread calls [`KinectSession::record`] in a loop
/// while any number of threads read the clouds or change the bounds.
/// Dropping the session stops the cameras and closes the device.
pub struct KinectSession<D: DepthDevice> {
    device: D,
    config: SessionConfig,
    calibration: Calibration,
    ray_table: RayTable,
    store: ContextStore,
}

impl<D: DepthDevice> KinectSession<D> {
    /// Opens the first device, fetches its calibration, builds the ray table
    /// and starts the cameras.
    ///
    /// # Errors
    ///
    /// Any failure here ends the session: `DeviceNotFound`, `DeviceOpen`,
    /// `Calibration` or `CameraStart`.
    pub fn open(device: D, config: SessionConfig) -> Result<Self, KinectError> {
        let start = Instant::now();

        if device.installed_count() == 0 {
            error!("no Kinect device installed");
            return Err(KinectError::DeviceNotFound);
        }

        if let Err(err) = device.open(0) {
            error!(%err, "failed to open device");
            return Err(KinectError::DeviceOpen(err));
        }

        let calibration = match device.calibration(config.depth_mode, config.color_resolution) {
            Ok(calibration) => calibration,
            Err(err) => {
                error!(%err, "failed to read calibration");
                device.close();
                return Err(KinectError::Calibration(err));
            }
        };

        let ray_table = RayTable::build(&device, &calibration);
        debug!(
            valid = ray_table.valid_count(),
            total = ray_table.len(),
            "ray table built"
        );

        if let Err(err) = device.start_cameras(&config) {
            error!(%err, "failed to start cameras");
            device.close();
            return Err(KinectError::CameraStart(err));
        }

        info!(
            depth = ?(calibration.depth.width, calibration.depth.height),
            color = ?(calibration.color.width, calibration.color.height),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "kinect initialized"
        );

        Ok(Self {
            device,
            config,
            calibration,
            ray_table,
            store: ContextStore::new(),
        })
    }

    /// Captures a frame, brings it on the `mode` grid, builds the clouds and
    /// publishes them, all under the store's exclusive lock.
    ///
    /// On error nothing is published, the previous clouds stay readable and
    /// every driver buffer acquired by the cycle has been released.
    ///
    /// # Returns
    ///
    /// The number of the published cycle.
    pub fn record(&self, mode: TransformMode) -> Result<u64, KinectError> {
        let start = Instant::now();
        let result = self.store.publish_with(|bounds, previous| {
            let capture = capture(&self.device, self.config.capture_timeout())?;
            let ray_table = (self.config.use_ray_table && mode == TransformMode::DepthSpace)
                .then_some(&self.ray_table);
            let frame = transform(
                &self.device,
                &self.calibration,
                ray_table,
                capture.depth()?,
                capture.color()?,
                mode,
            )?;
            construct_into(&frame.point_cloud, &frame.color, bounds, previous)
        });

        match &result {
            Ok(cycle) => debug!(
                cycle,
                %mode,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "kinect image frame captured"
            ),
            Err(err) => warn!(%err, kind = ?err.kind(), %mode, "record cycle abandoned"),
        }
        result
    }

    pub fn full_cloud(&self) -> MappedRwLockReadGuard<'_, PointCloud> {
        self.store.full_cloud()
    }

    pub fn context(&self) -> MappedRwLockReadGuard<'_, PointCloud> {
        self.store.context()
    }

    pub fn clouds(&self) -> MappedRwLockReadGuard<'_, Clouds> {
        self.store.clouds()
    }

    pub fn num_points(&self) -> usize {
        self.store.num_points()
    }

    /// See [`ContextStore::set_bounds`].
    pub fn set_bounds(&self, lower: Vector3<f32>, upper: Vector3<f32>) -> Result<(), KinectError> {
        self.store.set_bounds(lower, upper)
    }

    pub fn reset_bounds(&self) {
        self.store.reset_bounds()
    }

    pub fn bounds(&self) -> SpatialBounds {
        self.store.bounds()
    }

    pub fn cycle(&self) -> u64 {
        self.store.cycle()
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn ray_table(&self) -> &RayTable {
        &self.ray_table
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: DepthDevice> Drop for KinectSession<D> {
    fn drop(&mut self) {
        self.device.stop_cameras();
        self.device.close();
        debug!("kinect closed");
    }
}
