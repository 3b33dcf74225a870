use std::time::Duration;

use thiserror::Error;

use crate::frame::Plane;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No cameras found")]
    NoCamera,
    #[error("camera call {call} failed with status {status}")]
    Camera { call: &'static str, status: i32 },
    #[error("media call {call} failed with status {status}")]
    Media { call: &'static str, status: i32 },
    #[error("image reader window not ready after {0:?}")]
    ReaderTimeout(Duration),
    #[error("EGL error: {0}")]
    Egl(String),
    #[error("GL error: {0}")]
    Gl(String),
    #[error("No drawable surface bound")]
    NoSurface,
    #[error("{plane:?} plane holds {len} bytes, layout needs {needed}")]
    PlaneTooShort {
        plane: Plane,
        len: usize,
        needed: usize,
    },
    #[error("{plane:?} plane has invalid layout: {reason}")]
    PlaneLayout { plane: Plane, reason: &'static str },
    #[error("render thread error: {0}")]
    RenderThread(String),
}
