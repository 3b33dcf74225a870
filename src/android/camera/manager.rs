use std::ffi::{CStr, CString};
use std::mem::zeroed;
use std::ptr::{NonNull, null_mut};

use ndk_sys::{
    ACameraManager, ACameraManager_create, ACameraManager_delete,
    ACameraManager_deleteCameraIdList, ACameraManager_getCameraCharacteristics,
    ACameraManager_getCameraIdList, ACameraMetadata_const_entry, ACameraMetadata_free,
    ACameraMetadata_getConstEntry, acamera_metadata_tag, camera_status_t,
};
use scopeguard::defer;
use tracing::debug;

use super::status;
use crate::capture::{LensFacing, pick_camera};
use crate::error::Error;

pub struct CameraManager(NonNull<ACameraManager>);

impl Drop for CameraManager {
    fn drop(&mut self) {
        unsafe { ACameraManager_delete(self.0.as_ptr()) }
    }
}

impl CameraManager {
    pub fn new() -> Result<Self, Error> {
        NonNull::new(unsafe { ACameraManager_create() })
            .map(Self)
            .ok_or_else(|| status::null_handle("ACameraManager_create"))
    }

    pub fn as_ptr(&self) -> *mut ACameraManager {
        self.0.as_ptr()
    }

    pub fn camera_ids(&self) -> Result<Vec<CString>, Error> {
        let mut list = null_mut();
        status::camera("ACameraManager_getCameraIdList", unsafe {
            ACameraManager_getCameraIdList(self.as_ptr(), &mut list)
        })?;
        if list.is_null() {
            return Err(Error::NoCamera);
        }
        defer! {
            unsafe { ACameraManager_deleteCameraIdList(list) }
        }

        let list = unsafe { &*list };
        if list.numCameras < 1 || list.cameraIds.is_null() {
            return Ok(Vec::new());
        }
        let ids = unsafe { std::slice::from_raw_parts(list.cameraIds, list.numCameras as usize) };
        Ok(ids
            .iter()
            .filter(|id| !id.is_null())
            .map(|&id| unsafe { CStr::from_ptr(id) }.to_owned())
            .collect())
    }

    /// `None` when the characteristic cannot be read.
    pub fn lens_facing(&self, id: &CStr) -> Option<LensFacing> {
        let mut metadata = null_mut();
        let status = unsafe {
            ACameraManager_getCameraCharacteristics(self.as_ptr(), id.as_ptr(), &mut metadata)
        };
        if status != camera_status_t::ACAMERA_OK || metadata.is_null() {
            return None;
        }
        defer! {
            unsafe { ACameraMetadata_free(metadata) }
        }

        let mut entry: ACameraMetadata_const_entry = unsafe { zeroed() };
        let status = unsafe {
            ACameraMetadata_getConstEntry(
                metadata,
                acamera_metadata_tag::ACAMERA_LENS_FACING.0 as u32,
                &mut entry,
            )
        };
        if status != camera_status_t::ACAMERA_OK || entry.count == 0 {
            return None;
        }
        let value = unsafe { entry.data.u8_ };
        if value.is_null() {
            return None;
        }
        LensFacing::from_raw(unsafe { *value })
    }

    /// Back-facing camera if any, else the first one.
    pub fn select_camera(&self) -> Result<CString, Error> {
        let candidates: Vec<(CString, Option<LensFacing>)> = self
            .camera_ids()?
            .into_iter()
            .map(|id| {
                let facing = self.lens_facing(&id);
                debug!(id = ?id, ?facing, "Found camera");
                (id, facing)
            })
            .collect();

        pick_camera(&candidates).cloned().ok_or(Error::NoCamera)
    }
}
