mod calibrations;
pub(crate) use calibrations::{identity_calibration, sample_calibration};
mod devices;
pub(crate) use devices::started_device;
