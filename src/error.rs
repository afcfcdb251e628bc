use crate::device::DriverError;

/// How a caller should react to a [`KinectError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The session can't be used, no retry.
    Fatal,
    /// The cycle produced nothing, but it can be retried right away.
    Retryable,
    /// The cycle was abandoned and its buffers released.
    CycleAborted,
    /// Invalid input or failed I/O outside the record cycle.
    Usage,
}

/// Main error type for the library.
#[derive(Debug)]
pub enum KinectError {
    /// No depth camera is installed.
    DeviceNotFound,
    DeviceOpen(DriverError),
    Calibration(DriverError),
    CameraStart(DriverError),
    /// No frame arrived within the capture timeout.
    CaptureTimeout,
    CaptureFailed(DriverError),
    /// The capture arrived without one of its images, `"depth"` or `"color"`.
    MissingImage(&'static str),
    Allocation(String),
    Transform(DriverError),
    /// Used when the user pass a logical invalid parameter to a function.
    InvalidParameter(String),
    Config(String),
    Io(std::io::Error),
    Export(String),
}

impl std::fmt::Display for KinectError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            KinectError::DeviceNotFound => write!(f, "Failed to find Kinect device"),
            KinectError::DeviceOpen(err) => write!(f, "Failed to setup Kinect: {err}"),
            KinectError::Calibration(err) => write!(f, "Failed to calibrate Kinect: {err}"),
            KinectError::CameraStart(err) => write!(f, "Failed to start cameras: {err}"),
            KinectError::CaptureTimeout => write!(f, "Capture timeout exceeded"),
            KinectError::CaptureFailed(err) => write!(f, "Failed to read capture images: {err}"),
            KinectError::MissingImage(which) => {
                write!(f, "Failed to get {which} image from capture")
            }
            KinectError::Allocation(err) => write!(f, "Allocation error: {err}"),
            KinectError::Transform(err) => write!(f, "Transform error: {err}"),
            KinectError::InvalidParameter(err) => write!(f, "Parameter error: {err}"),
            KinectError::Config(err) => write!(f, "Config error: {err}"),
            KinectError::Io(err) => write!(f, "IO error: {err}"),
            KinectError::Export(err) => write!(f, "Export error: {err}"),
        }
    }
}

impl KinectError {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        KinectError::InvalidParameter(msg.to_string())
    }

    /// Classifies the error for the caller of a session operation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KinectError::DeviceNotFound
            | KinectError::DeviceOpen(_)
            | KinectError::Calibration(_)
            | KinectError::CameraStart(_) => ErrorKind::Fatal,
            KinectError::CaptureTimeout => ErrorKind::Retryable,
            KinectError::CaptureFailed(_)
            | KinectError::MissingImage(_)
            | KinectError::Allocation(_)
            | KinectError::Transform(_) => ErrorKind::CycleAborted,
            KinectError::InvalidParameter(_)
            | KinectError::Config(_)
            | KinectError::Io(_)
            | KinectError::Export(_) => ErrorKind::Usage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

impl std::error::Error for KinectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KinectError::DeviceOpen(err)
            | KinectError::Calibration(err)
            | KinectError::CameraStart(err)
            | KinectError::CaptureFailed(err)
            | KinectError::Transform(err) => Some(err),
            KinectError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KinectError {
    fn from(err: std::io::Error) -> Self {
        KinectError::Io(err)
    }
}

impl From<serde_json::Error> for KinectError {
    fn from(err: serde_json::Error) -> Self {
        KinectError::Config(err.to_string())
    }
}
