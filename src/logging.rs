//! tracing-subscriber setup. On device every event goes to logcat.

/// Installs the global fmt subscriber. Later calls are no-ops, since an
/// activity can be created several times in one process.
pub fn init(filter: &str) {
    #[cfg(target_os = "android")]
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(logcat::Logcat)
        .with_ansi(false)
        .without_time()
        .try_init();

    #[cfg(not(target_os = "android"))]
    let result = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if result.is_ok() {
        tracing::debug!(filter, "Logging initialised");
    }
}

#[cfg(target_os = "android")]
mod logcat {
    use std::ffi::CString;
    use std::io;

    use ndk_sys::android_LogPriority;
    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;

    #[link(name = "log")]
    unsafe extern "C" {}

    const TAG: &std::ffi::CStr = c"campreview";

    pub struct Logcat;

    /// Buffers one formatted event and hands it to logcat when dropped.
    pub struct LogcatLine {
        priority: android_LogPriority,
        buf: Vec<u8>,
    }

    impl io::Write for LogcatLine {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for LogcatLine {
        fn drop(&mut self) {
            while self.buf.last() == Some(&b'\n') {
                self.buf.pop();
            }
            self.buf.retain(|&b| b != 0);
            if let Ok(text) = CString::new(std::mem::take(&mut self.buf)) {
                unsafe {
                    ndk_sys::__android_log_write(self.priority.0 as i32, TAG.as_ptr(), text.as_ptr());
                }
            }
        }
    }

    impl<'a> MakeWriter<'a> for Logcat {
        type Writer = LogcatLine;

        fn make_writer(&'a self) -> Self::Writer {
            LogcatLine {
                priority: android_LogPriority::ANDROID_LOG_INFO,
                buf: Vec::new(),
            }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            let priority = match *meta.level() {
                Level::ERROR => android_LogPriority::ANDROID_LOG_ERROR,
                Level::WARN => android_LogPriority::ANDROID_LOG_WARN,
                Level::INFO => android_LogPriority::ANDROID_LOG_INFO,
                Level::DEBUG => android_LogPriority::ANDROID_LOG_DEBUG,
                _ => android_LogPriority::ANDROID_LOG_VERBOSE,
            };
            LogcatLine {
                priority,
                buf: Vec::new(),
            }
        }
    }
}
