use std::ffi::{CStr, c_int, c_void};
use std::ptr::{NonNull, null_mut};

use ndk_sys::{
    ACameraDevice, ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraManager_openCamera,
};
use tracing::{error, info, warn};

use super::manager::CameraManager;
use super::status;
use crate::error::Error;

pub struct CameraDevice {
    ptr: NonNull<ACameraDevice>,
    _callbacks: Box<ACameraDevice_StateCallbacks>,
}

impl Drop for CameraDevice {
    fn drop(&mut self) {
        unsafe { ACameraDevice_close(self.ptr.as_ptr()) };
    }
}

impl CameraDevice {
    pub fn open(manager: &CameraManager, id: &CStr) -> Result<Self, Error> {
        let mut callbacks = Box::new(ACameraDevice_StateCallbacks {
            context: null_mut(),
            onDisconnected: Some(on_disconnected),
            onError: Some(on_error),
        });
        let mut device = null_mut();
        status::camera("ACameraManager_openCamera", unsafe {
            ACameraManager_openCamera(manager.as_ptr(), id.as_ptr(), &mut *callbacks, &mut device)
        })?;
        let ptr = NonNull::new(device).ok_or_else(|| status::null_handle("ACameraManager_openCamera"))?;

        info!(id = ?id, "Camera opened");
        Ok(Self {
            ptr,
            _callbacks: callbacks,
        })
    }

    pub fn as_ptr(&self) -> *mut ACameraDevice {
        self.ptr.as_ptr()
    }
}

unsafe extern "C" fn on_disconnected(_context: *mut c_void, _device: *mut ACameraDevice) {
    warn!("Camera disconnected");
}

unsafe extern "C" fn on_error(_context: *mut c_void, _device: *mut ACameraDevice, error: c_int) {
    error!(error, "Camera device error");
}
