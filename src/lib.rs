//! Live camera preview for an Android native activity.
//!
//! Camera2 delivers YUV 4:2:0 images into a one-slot relay. A render thread
//! takes the newest one, uploads its planes to textures, converts to RGB in
//! a fragment shader and presents through EGL. The platform-independent
//! pieces live at the top level; everything that touches the NDK is under
//! `android`.

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod painter;
pub mod relay;
pub mod render;
pub mod shader;
pub mod upload;

#[cfg(target_os = "android")]
pub mod android;

pub use error::Error;
