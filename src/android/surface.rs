//! EGL display, context and window surface for the preview, plus the GLES
//! backend the render thread drives.

use std::ffi::{CStr, CString, c_void};
use std::num::NonZeroU32;
use std::ptr::NonNull;

use glutin::api::egl::config::Config;
use glutin::api::egl::context::PossiblyCurrentContext;
use glutin::api::egl::display::Display;
use glutin::api::egl::surface::Surface;
use glutin::config::{Api, ColorBufferType, ConfigSurfaceTypes, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, Version};
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, WindowSurface};
use ndk::native_window::NativeWindow;
use raw_window_handle::{
    AndroidDisplayHandle, AndroidNdkWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use tracing::{debug, info, warn};

use crate::config::ChromaFilter;
use crate::error::Error;
use crate::frame::YuvFrame;
use crate::painter::YuvPainter;
use crate::render::Backend;

fn egl(e: glutin::error::Error) -> Error {
    Error::Egl(e.to_string())
}

fn window_handle(window: &NativeWindow) -> RawWindowHandle {
    let ptr: NonNull<c_void> = window.ptr().cast();
    RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::new(ptr))
}

fn window_size(window: &NativeWindow) -> Result<(NonZeroU32, NonZeroU32), Error> {
    let size = |v: i32| NonZeroU32::new(v.max(0) as u32);
    match (size(window.width()), size(window.height())) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::Egl(format!(
            "window has no area ({}x{})",
            window.width(),
            window.height()
        ))),
    }
}

/// Owns the EGL objects for one native window at a time. The context is
/// created once and survives surface rebinds.
pub struct SurfaceManager {
    surface: Option<Surface<WindowSurface>>,
    context: Option<PossiblyCurrentContext>,
    window: Option<NativeWindow>,
    config: Config,
    display: Option<Display>,
}

impl SurfaceManager {
    /// Builds display, config, GLES 2 context and a window surface, then
    /// makes them current on the calling thread.
    pub fn create(window: NativeWindow) -> Result<Self, Error> {
        let raw_window = window_handle(&window);
        let display = unsafe {
            Display::new(RawDisplayHandle::Android(AndroidDisplayHandle::new()))
        }
        .map_err(egl)?;

        let template = ConfigTemplateBuilder::new()
            .with_api(Api::GLES2)
            .with_surface_type(ConfigSurfaceTypes::WINDOW)
            .with_buffer_type(ColorBufferType::Rgb {
                r_size: 8,
                g_size: 8,
                b_size: 8,
            })
            .compatible_with_native_window(raw_window)
            .build();
        let config = unsafe { display.find_configs(template) }
            .map_err(egl)?
            .next()
            .ok_or_else(|| Error::Egl("no matching EGL config".into()))?;

        let attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
            .build(Some(raw_window));
        let not_current = unsafe { display.create_context(&config, &attributes) }.map_err(egl)?;

        let surface = create_surface(&display, &config, &window)?;
        let context = not_current.make_current(&surface).map_err(egl)?;
        info!(
            width = window.width(),
            height = window.height(),
            "EGL surface created"
        );

        Ok(Self {
            surface: Some(surface),
            context: Some(context),
            window: Some(window),
            config,
            display: Some(display),
        })
    }

    /// Replaces the surface with one for `window`, keeping the context and
    /// every GL object created in it. On failure no surface is left, so
    /// drawing fails with [`Error::NoSurface`] until a later rebind works.
    pub fn rebind(&mut self, window: NativeWindow) -> Result<(), Error> {
        self.surface = None;
        self.window = None;

        let (Some(context), Some(display)) = (&self.context, &self.display) else {
            return Err(Error::Egl("display terminated".into()));
        };
        let surface = create_surface(display, &self.config, &window)?;
        context.make_current(&surface).map_err(egl)?;

        self.surface = Some(surface);
        self.window = Some(window);
        debug!(size = ?self.size(), "Surface rebound");
        Ok(())
    }

    pub fn ensure_current(&self) -> Result<(), Error> {
        let (Some(context), Some(surface)) = (&self.context, &self.surface) else {
            return Err(Error::NoSurface);
        };
        if !context.is_current() {
            context.make_current(surface).map_err(egl)?;
        }
        Ok(())
    }

    pub fn swap_buffers(&self) -> Result<(), Error> {
        let (Some(context), Some(surface)) = (&self.context, &self.surface) else {
            return Err(Error::NoSurface);
        };
        surface.swap_buffers(context).map_err(egl)
    }

    /// Current drawable size, queried from the surface each call.
    pub fn size(&self) -> Result<(u32, u32), Error> {
        let surface = self.surface.as_ref().ok_or(Error::NoSurface)?;
        match (surface.width(), surface.height()) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(Error::Egl("surface size unavailable".into())),
        }
    }

    pub fn get_proc_address(&self, name: &CStr) -> *const c_void {
        match &self.display {
            Some(display) => display.get_proc_address(name),
            None => std::ptr::null(),
        }
    }

    /// Releases the context from this thread, drops surface, context and
    /// window, then terminates the display. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = context.make_not_current() {
                warn!(error = %e, "Failed to release EGL context");
            }
        }
        if self.surface.take().is_some() {
            debug!("EGL surface destroyed");
        }
        self.window.take();

        // glutin only terminates on drop with EGL_KHR_display_reference
        if let Some(display) = self.display.take() {
            unsafe { display.terminate() };
            debug!("EGL display terminated");
        }
    }
}

impl Drop for SurfaceManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_surface(
    display: &Display,
    config: &Config,
    window: &NativeWindow,
) -> Result<Surface<WindowSurface>, Error> {
    let (width, height) = window_size(window)?;
    let attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(window_handle(window), width, height);
    unsafe { display.create_window_surface(config, &attributes) }.map_err(egl)
}

/// GLES 2 backend: EGL surface plus the YUV painter.
pub struct GlBackend {
    painter: Option<YuvPainter>,
    gl: glow::Context,
    surface: SurfaceManager,
}

impl GlBackend {
    /// Must run on the thread that will render.
    pub fn create(window: NativeWindow, chroma_filter: ChromaFilter) -> Result<Self, Error> {
        let surface = SurfaceManager::create(window)?;
        let gl = unsafe {
            glow::Context::from_loader_function(|name| match CString::new(name) {
                Ok(name) => surface.get_proc_address(&name),
                Err(_) => std::ptr::null(),
            })
        };
        let painter = unsafe { YuvPainter::new(&gl, chroma_filter)? };
        debug!(?chroma_filter, "GL backend ready");
        Ok(Self {
            painter: Some(painter),
            gl,
            surface,
        })
    }
}

impl Backend for GlBackend {
    type Window = NativeWindow;

    fn ensure_current(&mut self) -> Result<(), Error> {
        self.surface.ensure_current()
    }

    fn rebind(&mut self, window: NativeWindow) -> Result<(), Error> {
        self.surface.rebind(window)
    }

    fn draw(&mut self, frame: &dyn YuvFrame) -> Result<(), Error> {
        let viewport = self.surface.size()?;
        let painter = self
            .painter
            .as_mut()
            .ok_or_else(|| Error::Gl("painter destroyed".into()))?;
        unsafe { painter.paint(&self.gl, frame, viewport) }
    }

    fn present(&mut self) -> Result<(), Error> {
        self.surface.swap_buffers()
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        if let Some(painter) = self.painter.take() {
            match self.surface.ensure_current() {
                Ok(()) => unsafe { painter.destroy(&self.gl) },
                Err(e) => warn!(error = %e, "Leaking GL objects, context not current"),
            }
        }
        self.surface.destroy();
    }
}
