pub mod bounds;
pub mod camera;
pub mod capture;
pub mod config;
pub mod construct;
pub mod device;
pub mod error;
pub mod image;
pub mod io;
mod memory;
pub mod pointcloud;
pub mod ray_table;
pub mod session;
pub mod store;
pub mod transform;
pub mod transformer;

#[cfg(test)]
mod unit_test;

pub use crate::bounds::SpatialBounds;
pub use crate::config::SessionConfig;
pub use crate::construct::Clouds;
pub use crate::error::{ErrorKind, KinectError};
pub use crate::memory::Array2Recycle;
pub use crate::pointcloud::PointCloud;
pub use crate::ray_table::RayTable;
pub use crate::session::KinectSession;
pub use crate::store::ContextStore;
pub use crate::transformer::TransformMode;
