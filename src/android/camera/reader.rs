use std::ffi::c_void;
use std::ptr::{NonNull, null_mut};
use std::thread;
use std::time::{Duration, Instant};

use ndk_sys::{
    AIMAGE_FORMATS, AImage, AImage_delete, AImage_getHeight, AImage_getPlaneData,
    AImage_getPlanePixelStride, AImage_getPlaneRowStride, AImage_getTimestamp, AImage_getWidth,
    AImageReader, AImageReader_ImageListener, AImageReader_acquireLatestImage,
    AImageReader_delete, AImageReader_getWindow, AImageReader_new, AImageReader_setImageListener,
    ANativeWindow, media_status_t,
};
use tracing::debug;

use super::status;
use crate::capture::{ImageSource, deliver_latest};
use crate::config::CaptureConfig;
use crate::error::Error;
use crate::frame::{Plane, PlaneView, YuvFrame};

const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type FrameSink = Box<dyn Fn(CameraImage) + Send + Sync>;

struct Listener {
    sink: FrameSink,
}

/// Bounded queue of YUV_420_888 images fed by the camera.
pub struct ImageReader {
    ptr: NonNull<AImageReader>,
    // read from the callback thread until the reader is deleted
    listener: Option<Box<Listener>>,
}

impl Drop for ImageReader {
    fn drop(&mut self) {
        unsafe { AImageReader_delete(self.ptr.as_ptr()) };
        self.listener.take();
    }
}

impl ImageReader {
    pub fn new(config: &CaptureConfig) -> Result<Self, Error> {
        let mut reader = null_mut();
        status::media("AImageReader_new", unsafe {
            AImageReader_new(
                config.width as i32,
                config.height as i32,
                AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32,
                config.max_images as i32,
                &mut reader,
            )
        })?;
        let ptr = NonNull::new(reader).ok_or_else(|| status::null_handle("AImageReader_new"))?;
        debug!(
            width = config.width,
            height = config.height,
            max_images = config.max_images,
            "Image reader created"
        );
        Ok(Self {
            ptr,
            listener: None,
        })
    }

    /// Every "image available" notification acquires the newest image and
    /// passes it to `sink`.
    pub fn set_sink(&mut self, sink: FrameSink) -> Result<(), Error> {
        let listener = Box::new(Listener { sink });
        let mut raw = AImageReader_ImageListener {
            context: &*listener as *const Listener as *mut c_void,
            onImageAvailable: Some(on_image_available),
        };
        status::media("AImageReader_setImageListener", unsafe {
            AImageReader_setImageListener(self.ptr.as_ptr(), &mut raw)
        })?;
        self.listener = Some(listener);
        Ok(())
    }

    /// Polls for the reader's output window. The window stays owned by the
    /// reader.
    pub fn wait_for_window(&self, timeout: Duration) -> Result<NonNull<ANativeWindow>, Error> {
        let started = Instant::now();
        loop {
            let mut window = null_mut();
            let status = unsafe { AImageReader_getWindow(self.ptr.as_ptr(), &mut window) };
            if status == media_status_t::AMEDIA_OK {
                if let Some(window) = NonNull::new(window) {
                    debug!(waited = ?started.elapsed(), "Reader window ready");
                    return Ok(window);
                }
            }
            if started.elapsed() >= timeout {
                return Err(Error::ReaderTimeout(timeout));
            }
            thread::sleep(WINDOW_POLL_INTERVAL);
        }
    }
}

/// Reader handle as seen from its own callback.
struct CallbackReader(NonNull<AImageReader>);

impl ImageSource for CallbackReader {
    type Image = CameraImage;

    fn acquire_latest(&self) -> Result<Option<CameraImage>, Error> {
        let mut image = null_mut();
        let status = unsafe { AImageReader_acquireLatestImage(self.0.as_ptr(), &mut image) };
        if status == media_status_t::AMEDIA_IMGREADER_NO_BUFFER_AVAILABLE {
            return Ok(None);
        }
        status::media("AImageReader_acquireLatestImage", status)?;
        match NonNull::new(image) {
            Some(image) => unsafe { CameraImage::from_raw(image) }.map(Some),
            None => Ok(None),
        }
    }
}

unsafe extern "C" fn on_image_available(context: *mut c_void, reader: *mut AImageReader) {
    let (Some(listener), Some(reader)) = (
        unsafe { context.cast::<Listener>().as_ref() },
        NonNull::new(reader),
    ) else {
        return;
    };
    deliver_latest(&CallbackReader(reader), &*listener.sink);
}

/// An acquired camera image. Dropping it returns the buffer to the reader.
pub struct CameraImage {
    ptr: NonNull<AImage>,
    width: u32,
    height: u32,
}

// AImage accessors are safe from any thread; ownership moves with the handle.
unsafe impl Send for CameraImage {}

impl Drop for CameraImage {
    fn drop(&mut self) {
        unsafe { AImage_delete(self.ptr.as_ptr()) }
    }
}

impl CameraImage {
    /// Takes ownership of `ptr`; it is deleted even when this fails.
    unsafe fn from_raw(ptr: NonNull<AImage>) -> Result<Self, Error> {
        let mut image = Self {
            ptr,
            width: 0,
            height: 0,
        };
        let (mut width, mut height) = (0, 0);
        status::media("AImage_getWidth", unsafe { AImage_getWidth(ptr.as_ptr(), &mut width) })?;
        status::media("AImage_getHeight", unsafe {
            AImage_getHeight(ptr.as_ptr(), &mut height)
        })?;
        image.width = width.max(0) as u32;
        image.height = height.max(0) as u32;
        Ok(image)
    }
}

impl YuvFrame for CameraImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn plane(&self, plane: Plane) -> Result<PlaneView<'_>, Error> {
        let index = plane.index() as i32;
        let image = self.ptr.as_ptr();

        let (mut data, mut len) = (null_mut(), 0);
        status::media("AImage_getPlaneData", unsafe {
            AImage_getPlaneData(image, index, &mut data, &mut len)
        })?;
        let (mut row_stride, mut pixel_stride) = (0, 0);
        status::media("AImage_getPlaneRowStride", unsafe {
            AImage_getPlaneRowStride(image, index, &mut row_stride)
        })?;
        status::media("AImage_getPlanePixelStride", unsafe {
            AImage_getPlanePixelStride(image, index, &mut pixel_stride)
        })?;
        if data.is_null() || len <= 0 {
            return Err(Error::PlaneLayout {
                plane,
                reason: "no plane data",
            });
        }

        let (width, height) = plane.dimensions(self.width, self.height);
        Ok(PlaneView {
            plane,
            data: unsafe { std::slice::from_raw_parts(data, len as usize) },
            width,
            height,
            row_stride: row_stride.max(0) as usize,
            pixel_stride: pixel_stride.max(0) as usize,
        })
    }

    fn timestamp_ns(&self) -> Option<i64> {
        let mut timestamp = 0;
        let status = unsafe { AImage_getTimestamp(self.ptr.as_ptr(), &mut timestamp) };
        (status == media_status_t::AMEDIA_OK).then_some(timestamp)
    }
}
