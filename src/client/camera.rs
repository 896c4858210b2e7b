use async_trait::async_trait;
use thiserror::Error;

/// Which physical camera the client asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera.
    #[default]
    Environment,
    /// Front camera.
    User,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

/// Permission or device failure while acquiring a camera.
#[derive(Debug, Error)]
#[error("camera unavailable: {0}")]
pub struct CameraAccessError(pub String);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no live camera stream")]
    NoStream,

    #[error("failed to capture frame: {0}")]
    Frame(String),
}

/// A live camera stream.
pub trait MediaStream: Send {
    /// Encodes the current frame as JPEG.
    fn capture_jpeg(&self) -> Result<Vec<u8>, CaptureError>;

    /// Stops every track of the stream.
    fn stop(&mut self);
}

/// Source of camera streams, e.g. the browser's media devices.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self, facing: FacingMode) -> Result<Box<dyn MediaStream>, CameraAccessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_restores_the_facing_mode() {
        let facing = FacingMode::default();
        assert_eq!(facing.as_str(), "environment");
        assert_eq!(facing.toggled().as_str(), "user");
        assert_eq!(facing.toggled().toggled(), facing);
    }
}
