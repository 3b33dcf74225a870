//! Dedicated render thread: waits on the relay, draws each frame, presents it.
//!
//! The thread owns the GPU backend from creation to teardown, so GL state
//! never leaves it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::error::Error;
use crate::frame::YuvFrame;
use crate::relay::FrameRelay;

const RENDER_THREAD_NAME: &str = "campreview-render";

/// Drawing target owned by the render thread. Dropping it tears down GPU
/// and display resources.
pub trait Backend {
    type Window: Send + 'static;

    /// Makes the context and surface current on this thread if they are not.
    fn ensure_current(&mut self) -> Result<(), Error>;

    /// Replaces the drawable surface with one for `window`.
    fn rebind(&mut self, window: Self::Window) -> Result<(), Error>;

    fn draw(&mut self, frame: &dyn YuvFrame) -> Result<(), Error>;

    fn present(&mut self) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: u64,
    pub skipped: u64,
}

struct Shared<W> {
    running: AtomicBool,
    state: Mutex<RenderState>,
    pending_window: Mutex<Option<W>>,
    drawn: AtomicU64,
    skipped: AtomicU64,
}

impl<W> Shared<W> {
    fn set_state(&self, state: RenderState) {
        *self.state.lock() = state;
        debug!(?state, "Render state");
    }

    fn stats(&self) -> RenderStats {
        RenderStats {
            drawn: self.drawn.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

pub struct RenderLoop<F, W> {
    relay: Arc<FrameRelay<F>>,
    shared: Arc<Shared<W>>,
    thread: Option<JoinHandle<()>>,
}

impl<F, W> RenderLoop<F, W>
where
    F: YuvFrame + Send + 'static,
    W: Send + 'static,
{
    /// Spawns the render thread and builds the backend on it.
    ///
    /// Returns once the backend is ready, or with its error after the thread
    /// has exited.
    pub fn start<B, M>(relay: Arc<FrameRelay<F>>, make_backend: M) -> Result<Self, Error>
    where
        B: Backend<Window = W>,
        M: FnOnce() -> Result<B, Error> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            state: Mutex::new(RenderState::Stopped),
            pending_window: Mutex::new(None),
            drawn: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        });
        shared.set_state(RenderState::Starting);

        let (init_tx, init_rx) = mpsc::channel();
        let thread = {
            let relay = relay.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name(RENDER_THREAD_NAME.into())
                .spawn(move || {
                    let mut backend = match make_backend() {
                        Ok(backend) => backend,
                        Err(e) => {
                            let _ = init_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = init_tx.send(Ok(()));
                    run(&relay, &shared, &mut backend);
                    drop(backend);
                    debug!("Render backend torn down");
                })
        };
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                shared.set_state(RenderState::Stopped);
                return Err(Error::RenderThread(e.to_string()));
            }
        };

        let init = init_rx
            .recv()
            .unwrap_or_else(|_| Err(Error::RenderThread("exited during startup".into())));
        if let Err(e) = init {
            shared.running.store(false, Ordering::Release);
            if thread.join().is_err() {
                error!("Render thread panicked during startup");
            }
            shared.set_state(RenderState::Stopped);
            return Err(e);
        }

        shared.set_state(RenderState::Running);
        info!("Render loop running");
        Ok(Self {
            relay,
            shared,
            thread: Some(thread),
        })
    }
}

impl<F, W> RenderLoop<F, W> {
    /// Signals the thread, wakes it and joins it. Blocks until GPU teardown
    /// has finished. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shared.set_state(RenderState::Stopping);
        self.shared.running.store(false, Ordering::Release);
        self.relay.shutdown();

        if thread.join().is_err() {
            error!("Render thread panicked");
        }
        self.shared.set_state(RenderState::Stopped);

        let RenderStats { drawn, skipped } = self.shared.stats();
        let relay = self.relay.stats();
        info!(
            drawn,
            skipped,
            dropped = relay.replaced,
            "Render loop stopped"
        );
    }

    /// Queues a surface switch. The render thread applies it before its next
    /// draw; a newer request replaces an unapplied one.
    pub fn request_rebind(&self, window: W) {
        *self.shared.pending_window.lock() = Some(window);
    }

    pub fn state(&self) -> RenderState {
        *self.shared.state.lock()
    }

    pub fn stats(&self) -> RenderStats {
        self.shared.stats()
    }
}

impl<F, W> Drop for RenderLoop<F, W> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<F, B>(relay: &FrameRelay<F>, shared: &Shared<B::Window>, backend: &mut B)
where
    F: YuvFrame,
    B: Backend,
{
    while shared.running.load(Ordering::Acquire) {
        let Some(frame) = relay.take() else {
            break;
        };

        let pending = shared.pending_window.lock().take();
        if let Some(window) = pending {
            match backend.rebind(window) {
                Ok(()) => info!("Surface rebound"),
                Err(e) => warn!(error = %e, "Surface rebind failed"),
            }
        }

        match draw_frame(backend, &frame) {
            Ok(()) => {
                let drawn = shared.drawn.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(drawn, timestamp_ns = ?frame.timestamp_ns(), "Presented");
                if drawn % 100 == 0 {
                    info!(drawn, "Progress");
                }
            }
            Err(e) => {
                shared.skipped.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Skipping frame");
            }
        }
        // releases the frame back to its producer
        drop(frame);
    }
}

fn draw_frame<B: Backend>(backend: &mut B, frame: &dyn YuvFrame) -> Result<(), Error> {
    backend.ensure_current()?;
    backend.draw(frame)?;
    backend.present()
}
