use ndk_sys::{camera_status_t, media_status_t};

use crate::error::Error;

pub(super) fn camera(call: &'static str, status: camera_status_t) -> Result<(), Error> {
    if status == camera_status_t::ACAMERA_OK {
        Ok(())
    } else {
        Err(Error::Camera {
            call,
            status: status.0 as i32,
        })
    }
}

pub(super) fn media(call: &'static str, status: media_status_t) -> Result<(), Error> {
    if status == media_status_t::AMEDIA_OK {
        Ok(())
    } else {
        Err(Error::Media {
            call,
            status: status.0 as i32,
        })
    }
}

/// For constructors that hand back a null handle without a status.
pub(super) fn null_handle(call: &'static str) -> Error {
    Error::Camera { call, status: -1 }
}
