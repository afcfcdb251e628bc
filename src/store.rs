use nalgebra::Vector3;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::{bounds::SpatialBounds, construct::Clouds, error::KinectError, pointcloud::PointCloud};

struct State {
    clouds: Clouds,
    bounds: SpatialBounds,
    cycle: u64,
    /// Clouds replaced by the last publish, reused by the next cycle.
    spare: Option<Clouds>,
}

/// Holds the last published full cloud and context, and the bounds used to
/// build the next context.
///
/// Writers ([`ContextStore::publish_with`], [`ContextStore::set_bounds`]) are
/// exclusive. Readers share access and block while a writer is active, so a
/// reader sees either the previous cycle or the new one in full, never a mix.
/// The handles returned by the readers hold the shared lock until dropped.
pub struct ContextStore {
    state: RwLock<State>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Empty clouds and unbounded context.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                clouds: Clouds::default(),
                bounds: SpatialBounds::unbounded(),
                cycle: 0,
                spare: None,
            }),
        }
    }

    /// Sets the context region used from the next cycle on.
    ///
    /// # Arguments
    ///
    /// * `lower` - Lower corner, in millimeters.
    /// * `upper` - Upper corner, in millimeters.
    pub fn set_bounds(&self, lower: Vector3<f32>, upper: Vector3<f32>) -> Result<(), KinectError> {
        let bounds = SpatialBounds::new(lower, upper);
        if !bounds.is_valid() {
            return Err(KinectError::invalid_parameter(format!(
                "lower bound {:?} is not below upper bound {:?}",
                lower.as_slice(),
                upper.as_slice()
            )));
        }
        info!(lower = ?lower.as_slice(), upper = ?upper.as_slice(), "context bounds set");
        self.state.write().bounds = bounds;
        Ok(())
    }

    /// Goes back to an unbounded context.
    pub fn reset_bounds(&self) {
        self.state.write().bounds = SpatialBounds::unbounded();
    }

    pub fn bounds(&self) -> SpatialBounds {
        self.state.read().bounds.clone()
    }

    pub fn full_cloud(&self) -> MappedRwLockReadGuard<'_, PointCloud> {
        RwLockReadGuard::map(self.state.read(), |state| &state.clouds.full)
    }

    pub fn context(&self) -> MappedRwLockReadGuard<'_, PointCloud> {
        RwLockReadGuard::map(self.state.read(), |state| &state.clouds.context)
    }

    /// Both clouds under a single read.
    pub fn clouds(&self) -> MappedRwLockReadGuard<'_, Clouds> {
        RwLockReadGuard::map(self.state.read(), |state| &state.clouds)
    }

    pub fn num_points(&self) -> usize {
        self.state.read().clouds.num_points()
    }

    /// Number of cycles published so far.
    pub fn cycle(&self) -> u64 {
        self.state.read().cycle
    }

    /// Runs `produce` under the exclusive lock and publishes its clouds.
    ///
    /// `produce` receives the current bounds and, when available, the clouds
    /// of an earlier cycle to reuse. If it fails the published state is left
    /// as it was.
    ///
    /// # Returns
    ///
    /// The number of the published cycle.
    pub fn publish_with<F>(&self, produce: F) -> Result<u64, KinectError>
    where
        F: FnOnce(&SpatialBounds, Option<Clouds>) -> Result<Clouds, KinectError>,
    {
        let mut state = self.state.write();
        let spare = state.spare.take();
        let clouds = produce(&state.bounds, spare)?;
        if clouds.full.len() != clouds.context.len() {
            return Err(KinectError::invalid_parameter(format!(
                "full cloud has {} points but context has {}",
                clouds.full.len(),
                clouds.context.len()
            )));
        }

        let previous = std::mem::replace(&mut state.clouds, clouds);
        state.spare = Some(previous);
        state.cycle += 1;
        debug!(cycle = state.cycle, num_points = state.clouds.num_points(), "clouds published");
        Ok(state.cycle)
    }
}
