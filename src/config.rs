use std::path::Path;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::error::KinectError;

/// Resolution of the color camera. The device always delivers BGRA32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorResolution {
    #[serde(rename = "720p")]
    R720p,
    #[serde(rename = "1080p")]
    R1080p,
    #[serde(rename = "1440p")]
    R1440p,
    #[serde(rename = "1536p")]
    R1536p,
    #[serde(rename = "2160p")]
    R2160p,
    #[serde(rename = "3072p")]
    R3072p,
}

impl ColorResolution {
    /// (width, height) in pixels.
    pub fn size(&self) -> (usize, usize) {
        match self {
            ColorResolution::R720p => (1280, 720),
            ColorResolution::R1080p => (1920, 1080),
            ColorResolution::R1440p => (2560, 1440),
            ColorResolution::R1536p => (2048, 1536),
            ColorResolution::R2160p => (3840, 2160),
            ColorResolution::R3072p => (4096, 3072),
        }
    }
}

/// Operating mode of the depth camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    NfovBinned,
    NfovUnbinned,
    WfovBinned,
    WfovUnbinned,
    PassiveIr,
}

impl DepthMode {
    /// (width, height) in pixels.
    pub fn size(&self) -> (usize, usize) {
        match self {
            DepthMode::NfovBinned => (320, 288),
            DepthMode::NfovUnbinned => (640, 576),
            DepthMode::WfovBinned => (512, 512),
            DepthMode::WfovUnbinned | DepthMode::PassiveIr => (1024, 1024),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "5")]
    Fps5,
    #[serde(rename = "15")]
    Fps15,
    #[serde(rename = "30")]
    Fps30,
}

impl FrameRate {
    pub fn hz(&self) -> u32 {
        match self {
            FrameRate::Fps5 => 5,
            FrameRate::Fps15 => 15,
            FrameRate::Fps30 => 30,
        }
    }
}

/// Settings fixed when a session is opened.
///
/// See <https://docs.microsoft.com/en-us/azure/kinect-dk/hardware-specification#depth-camera-supported-operating-modes>
/// for the valid mode combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long `record` waits for a frame, in milliseconds.
    pub capture_timeout_ms: u64,
    pub color_resolution: ColorResolution,
    pub depth_mode: DepthMode,
    pub camera_fps: FrameRate,
    /// Only deliver captures holding both a depth and a color image. Passed
    /// to the driver when the cameras start.
    pub synchronized_images_only: bool,
    /// Convert depth with the precomputed ray table in depth space instead of
    /// asking the driver for every frame.
    pub use_ray_table: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: 1000,
            color_resolution: ColorResolution::R720p,
            depth_mode: DepthMode::NfovUnbinned,
            camera_fps: FrameRate::Fps30,
            synchronized_images_only: true,
            use_ray_table: true,
        }
    }
}

impl SessionConfig {
    /// Loads a JSON config file. Missing fields take their default value.
    pub fn from_json_file<P: AsRef<Path>>(filepath: P) -> Result<Self, KinectError> {
        let reader = std::io::BufReader::new(std::fs::File::open(filepath)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, KinectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn capture_timeout_ms(mut self, value: u64) -> Self {
        self.capture_timeout_ms = value;
        self
    }

    pub fn color_resolution(mut self, value: ColorResolution) -> Self {
        self.color_resolution = value;
        self
    }

    pub fn depth_mode(mut self, value: DepthMode) -> Self {
        self.depth_mode = value;
        self
    }

    pub fn synchronized_images_only(mut self, value: bool) -> Self {
        self.synchronized_images_only = value;
        self
    }

    pub fn use_ray_table(mut self, value: bool) -> Self {
        self.use_ray_table = value;
        self
    }
}
