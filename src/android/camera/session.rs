//! Session plumbing between an opened device and the reader's window.
//! Each handle frees itself on drop.

use std::ffi::c_void;
use std::ptr::{NonNull, null_mut};

use ndk_sys::{
    ACameraCaptureSession, ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating,
    ACameraDevice_createCaptureRequest, ACameraDevice_createCaptureSession,
    ACameraDevice_request_template, ACameraOutputTarget, ACameraOutputTarget_create,
    ACameraOutputTarget_free, ACaptureRequest, ACaptureRequest_addTarget, ACaptureRequest_free,
    ACaptureSessionOutput, ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
    ACaptureSessionOutput_create, ACaptureSessionOutput_free, ANativeWindow,
};
use tracing::{debug, warn};

use super::device::CameraDevice;
use super::status;
use crate::error::Error;

pub struct SessionOutputs {
    container: NonNull<ACaptureSessionOutputContainer>,
    output: Option<NonNull<ACaptureSessionOutput>>,
}

impl Drop for SessionOutputs {
    fn drop(&mut self) {
        unsafe {
            if let Some(output) = self.output.take() {
                ACaptureSessionOutput_free(output.as_ptr());
            }
            ACaptureSessionOutputContainer_free(self.container.as_ptr());
        }
    }
}

impl SessionOutputs {
    /// Container holding a single output that streams into `window`.
    pub fn new(window: NonNull<ANativeWindow>) -> Result<Self, Error> {
        let mut container = null_mut();
        status::camera("ACaptureSessionOutputContainer_create", unsafe {
            ACaptureSessionOutputContainer_create(&mut container)
        })?;
        let container = NonNull::new(container)
            .ok_or_else(|| status::null_handle("ACaptureSessionOutputContainer_create"))?;
        let mut outputs = Self {
            container,
            output: None,
        };

        let mut output = null_mut();
        status::camera("ACaptureSessionOutput_create", unsafe {
            ACaptureSessionOutput_create(window.as_ptr(), &mut output)
        })?;
        let output =
            NonNull::new(output).ok_or_else(|| status::null_handle("ACaptureSessionOutput_create"))?;
        outputs.output = Some(output);

        status::camera("ACaptureSessionOutputContainer_add", unsafe {
            ACaptureSessionOutputContainer_add(outputs.container.as_ptr(), output.as_ptr())
        })?;
        Ok(outputs)
    }
}

pub struct OutputTarget(NonNull<ACameraOutputTarget>);

impl Drop for OutputTarget {
    fn drop(&mut self) {
        unsafe { ACameraOutputTarget_free(self.0.as_ptr()) }
    }
}

impl OutputTarget {
    pub fn new(window: NonNull<ANativeWindow>) -> Result<Self, Error> {
        let mut target = null_mut();
        status::camera("ACameraOutputTarget_create", unsafe {
            ACameraOutputTarget_create(window.as_ptr(), &mut target)
        })?;
        NonNull::new(target)
            .map(Self)
            .ok_or_else(|| status::null_handle("ACameraOutputTarget_create"))
    }
}

pub struct CaptureRequest(NonNull<ACaptureRequest>);

impl Drop for CaptureRequest {
    fn drop(&mut self) {
        unsafe { ACaptureRequest_free(self.0.as_ptr()) }
    }
}

impl CaptureRequest {
    pub fn preview(device: &CameraDevice) -> Result<Self, Error> {
        let mut request = null_mut();
        status::camera("ACameraDevice_createCaptureRequest", unsafe {
            ACameraDevice_createCaptureRequest(
                device.as_ptr(),
                ACameraDevice_request_template::TEMPLATE_PREVIEW,
                &mut request,
            )
        })?;
        NonNull::new(request)
            .map(Self)
            .ok_or_else(|| status::null_handle("ACameraDevice_createCaptureRequest"))
    }

    pub fn add_target(&mut self, target: &OutputTarget) -> Result<(), Error> {
        status::camera("ACaptureRequest_addTarget", unsafe {
            ACaptureRequest_addTarget(self.0.as_ptr(), target.0.as_ptr())
        })
    }
}

pub struct CameraSession {
    ptr: NonNull<ACameraCaptureSession>,
    _callbacks: Box<ACameraCaptureSession_stateCallbacks>,
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        unsafe { ACameraCaptureSession_close(self.ptr.as_ptr()) }
    }
}

impl CameraSession {
    pub fn create(device: &CameraDevice, outputs: &SessionOutputs) -> Result<Self, Error> {
        let callbacks = Box::new(ACameraCaptureSession_stateCallbacks {
            context: null_mut(),
            onClosed: Some(on_closed),
            onReady: Some(on_ready),
            onActive: Some(on_active),
        });
        let mut session = null_mut();
        status::camera("ACameraDevice_createCaptureSession", unsafe {
            ACameraDevice_createCaptureSession(
                device.as_ptr(),
                outputs.container.as_ptr(),
                &*callbacks,
                &mut session,
            )
        })?;
        let ptr = NonNull::new(session)
            .ok_or_else(|| status::null_handle("ACameraDevice_createCaptureSession"))?;
        Ok(Self {
            ptr,
            _callbacks: callbacks,
        })
    }
}

/// Open-ended repeating request on a session. Must be dropped before the
/// session it was started on.
pub struct Streaming {
    session: NonNull<ACameraCaptureSession>,
}

impl Drop for Streaming {
    fn drop(&mut self) {
        let status = unsafe { ACameraCaptureSession_stopRepeating(self.session.as_ptr()) };
        if let Err(e) = status::camera("ACameraCaptureSession_stopRepeating", status) {
            warn!(error = %e, "Failed to stop repeating capture");
        }
    }
}

impl Streaming {
    pub fn start(session: &CameraSession, request: &CaptureRequest) -> Result<Self, Error> {
        let mut requests = [request.0.as_ptr()];
        status::camera("ACameraCaptureSession_setRepeatingRequest", unsafe {
            ACameraCaptureSession_setRepeatingRequest(
                session.ptr.as_ptr(),
                null_mut(),
                1,
                requests.as_mut_ptr(),
                null_mut(),
            )
        })?;
        Ok(Self {
            session: session.ptr,
        })
    }
}

unsafe extern "C" fn on_closed(_context: *mut c_void, _session: *mut ACameraCaptureSession) {
    debug!("Capture session closed");
}

unsafe extern "C" fn on_ready(_context: *mut c_void, _session: *mut ACameraCaptureSession) {
    debug!("Capture session ready");
}

unsafe extern "C" fn on_active(_context: *mut c_void, _session: *mut ACameraCaptureSession) {
    debug!("Capture session active");
}
