//! Wires capture, relay and render loop together per window lifetime.

use std::sync::Arc;

use ndk::native_window::NativeWindow;
use tracing::{error, info, warn};

use super::camera::{CameraImage, CaptureSession};
use super::surface::GlBackend;
use crate::config::PreviewConfig;
use crate::error::Error;
use crate::relay::FrameRelay;
use crate::render::RenderLoop;

/// Renderer and camera running against one window.
pub struct PreviewApp {
    render: RenderLoop<CameraImage, NativeWindow>,
    camera: CaptureSession,
}

impl PreviewApp {
    /// Starts rendering into `window`, then opens the camera. A camera
    /// failure stops the renderer again before returning.
    pub fn launch(window: NativeWindow, config: &PreviewConfig) -> Result<Self, Error> {
        let relay = Arc::new(FrameRelay::new());
        let chroma_filter = config.chroma_filter;
        let mut render =
            RenderLoop::start(relay.clone(), move || GlBackend::create(window, chroma_filter))?;

        let sink = {
            let relay = relay.clone();
            move |image: CameraImage| {
                relay.submit(image);
            }
        };
        let camera = match CaptureSession::open(&config.capture, sink) {
            Ok(camera) => camera,
            Err(e) => {
                render.stop();
                return Err(e);
            }
        };

        Ok(Self { render, camera })
    }

    pub fn window_changed(&self, window: NativeWindow) {
        self.render.request_rebind(window);
    }

    /// Renderer first: it releases every frame it holds before the reader
    /// that owns them is deleted.
    pub fn shutdown(mut self) {
        self.render.stop();
        self.camera.close();
    }
}

/// Window lifecycle entry points for the native activity.
pub struct Preview {
    config: PreviewConfig,
    app: Option<PreviewApp>,
}

impl Preview {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config, app: None }
    }

    pub fn on_window_available(&mut self, window: NativeWindow) {
        if let Some(app) = &self.app {
            info!("Window replaced, rebinding surface");
            app.window_changed(window);
            return;
        }
        match PreviewApp::launch(window, &self.config) {
            Ok(app) => {
                info!("Preview started");
                self.app = Some(app);
            }
            Err(e) => error!(error = %e, "Failed to start preview"),
        }
    }

    pub fn on_window_lost(&mut self) {
        match self.app.take() {
            Some(app) => {
                app.shutdown();
                info!("Preview stopped");
            }
            None => warn!("Window lost with no preview running"),
        }
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        if self.app.is_some() {
            self.on_window_lost();
        }
    }
}
