//! Camera2 NDK capture feeding an image reader.

mod device;
mod manager;
mod reader;
mod session;
mod status;

use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::error::Error;

use self::device::CameraDevice;
use self::manager::CameraManager;
use self::session::{CameraSession, CaptureRequest, OutputTarget, SessionOutputs, Streaming};

pub use self::reader::CameraImage;
use self::reader::ImageReader;

#[link(name = "camera2ndk")]
unsafe extern "C" {}

#[link(name = "mediandk")]
unsafe extern "C" {}

// Field order is teardown order.
struct Pipeline {
    _streaming: Streaming,
    _request: CaptureRequest,
    _target: OutputTarget,
    _session: CameraSession,
    _outputs: SessionOutputs,
    _device: CameraDevice,
    _reader: ImageReader,
    _manager: CameraManager,
}

/// A running preview capture. Every acquired image goes to the sink given
/// to [`CaptureSession::open`].
pub struct CaptureSession {
    pipeline: Option<Pipeline>,
}

impl CaptureSession {
    pub fn open<S>(config: &CaptureConfig, on_frame: S) -> Result<Self, Error>
    where
        S: Fn(CameraImage) + Send + Sync + 'static,
    {
        let manager = CameraManager::new()?;
        let id = manager.select_camera()?;

        let mut reader = ImageReader::new(config)?;
        reader.set_sink(Box::new(on_frame))?;
        let window = reader.wait_for_window(config.reader_ready_timeout)?;

        let device = CameraDevice::open(&manager, &id)?;
        let outputs = SessionOutputs::new(window)?;
        let session = CameraSession::create(&device, &outputs)?;
        let target = OutputTarget::new(window)?;
        let mut request = CaptureRequest::preview(&device)?;
        request.add_target(&target)?;
        let streaming = Streaming::start(&session, &request)?;

        info!(
            id = ?id,
            width = config.width,
            height = config.height,
            "Capture started"
        );
        Ok(Self {
            pipeline: Some(Pipeline {
                _streaming: streaming,
                _request: request,
                _target: target,
                _session: session,
                _outputs: outputs,
                _device: device,
                _reader: reader,
                _manager: manager,
            }),
        })
    }

    /// Stops streaming and releases every camera and reader handle.
    pub fn close(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            drop(pipeline);
            debug!("Capture closed");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}
