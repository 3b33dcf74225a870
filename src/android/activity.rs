//! `NativeActivity` entry point. The activity's `instance` slot owns the
//! [`Preview`] for as long as the activity lives.

use std::ffi::c_void;
use std::ptr::NonNull;

use ndk::native_window::NativeWindow;
use ndk_sys::{ANativeActivity, ANativeWindow};
use tracing::{debug, warn};

use super::app::Preview;
use crate::config::PreviewConfig;
use crate::logging;

/// # Safety
/// Called by the platform with a valid activity on its main thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ANativeActivity_onCreate(
    activity: *mut ANativeActivity,
    _saved_state: *mut c_void,
    _saved_state_size: usize,
) {
    let config = PreviewConfig::from_system_properties();
    logging::init(&config.log_filter);
    debug!(?config, "Activity created");

    let Some(activity) = (unsafe { activity.as_mut() }) else {
        return;
    };
    let Some(callbacks) = (unsafe { activity.callbacks.as_mut() }) else {
        warn!("Activity has no callback table");
        return;
    };
    callbacks.onNativeWindowCreated = Some(on_native_window_created);
    callbacks.onNativeWindowDestroyed = Some(on_native_window_destroyed);
    callbacks.onDestroy = Some(on_destroy);

    activity.instance = Box::into_raw(Box::new(Preview::new(config))).cast();
}

unsafe fn preview<'a>(activity: *mut ANativeActivity) -> Option<&'a mut Preview> {
    let activity = unsafe { activity.as_ref() }?;
    unsafe { activity.instance.cast::<Preview>().as_mut() }
}

unsafe extern "C" fn on_native_window_created(
    activity: *mut ANativeActivity,
    window: *mut ANativeWindow,
) {
    let (Some(preview), Some(window)) = (unsafe { preview(activity) }, NonNull::new(window)) else {
        return;
    };
    // own reference; the platform's one ends with the destroyed callback
    let window = unsafe { NativeWindow::clone_from_ptr(window) };
    preview.on_window_available(window);
}

unsafe extern "C" fn on_native_window_destroyed(
    activity: *mut ANativeActivity,
    _window: *mut ANativeWindow,
) {
    if let Some(preview) = unsafe { preview(activity) } {
        preview.on_window_lost();
    }
}

unsafe extern "C" fn on_destroy(activity: *mut ANativeActivity) {
    let Some(activity) = (unsafe { activity.as_mut() }) else {
        return;
    };
    let instance = std::mem::replace(&mut activity.instance, std::ptr::null_mut());
    if !instance.is_null() {
        drop(unsafe { Box::from_raw(instance.cast::<Preview>()) });
        debug!("Activity destroyed");
    }
}
