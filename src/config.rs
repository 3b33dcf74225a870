use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_LOG_FILTER: &str = "info,campreview=debug";

/// Filtering used when the half-resolution chroma planes are stretched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChromaFilter {
    #[default]
    Linear,
    Nearest,
}

impl FromStr for ChromaFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(ChromaFilter::Linear),
            "nearest" => Ok(ChromaFilter::Nearest),
            other => Err(format!("unknown chroma filter {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// Images the reader may hold at once.
    pub max_images: u32,
    /// How long to wait for the reader's output window.
    pub reader_ready_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            max_images: 4,
            reader_ready_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub capture: CaptureConfig,
    pub chroma_filter: ChromaFilter,
    pub log_filter: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            chroma_filter: ChromaFilter::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PreviewConfig {
    /// Defaults overridden by whatever `lookup` knows about. Values that do
    /// not parse keep the default.
    ///
    /// Keys: `width`, `height`, `max_images`, `reader_timeout_ms`,
    /// `chroma_filter`, `log`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let capture = &mut config.capture;

        capture.width = parse_or(&lookup, "width", capture.width, |v| v > 0);
        capture.height = parse_or(&lookup, "height", capture.height, |v| v > 0);
        capture.max_images = parse_or(&lookup, "max_images", capture.max_images, |v| v > 0);
        let timeout_ms = parse_or(
            &lookup,
            "reader_timeout_ms",
            capture.reader_ready_timeout.as_millis() as u64,
            |v| v > 0,
        );
        capture.reader_ready_timeout = Duration::from_millis(timeout_ms);
        config.chroma_filter = parse_or(&lookup, "chroma_filter", config.chroma_filter, |_| true);

        if let Some(filter) = lookup("log").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        config
    }

    /// Reads overrides from `debug.campreview.<key>` system properties.
    #[cfg(target_os = "android")]
    pub fn from_system_properties() -> Self {
        Self::from_lookup(|key| system_property(&format!("debug.campreview.{key}")))
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T, valid: impl Fn(T) -> bool) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(value) => value,
        _ => {
            warn!(key, value = %raw, "Ignoring invalid config value");
            default
        }
    }
}

#[cfg(target_os = "android")]
fn system_property(name: &str) -> Option<String> {
    use std::ffi::{CStr, CString};

    let name = CString::new(name).ok()?;
    let mut value = [0 as libc::c_char; libc::PROP_VALUE_MAX as usize];
    let len = unsafe { libc::__system_property_get(name.as_ptr(), value.as_mut_ptr()) };
    if len <= 0 {
        return None;
    }
    let value = unsafe { CStr::from_ptr(value.as_ptr()) };
    Some(value.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_preview_size() {
        let config = PreviewConfig::from_lookup(|_| None);
        assert_eq!(config, PreviewConfig::default());
        assert_eq!((config.capture.width, config.capture.height), (640, 480));
        assert_eq!(config.capture.max_images, 4);
        assert_eq!(config.capture.reader_ready_timeout, Duration::from_secs(2));
        assert_eq!(config.chroma_filter, ChromaFilter::Linear);
    }

    #[test]
    fn overrides_are_applied() {
        let config = PreviewConfig::from_lookup(lookup(&[
            ("width", "1280"),
            ("height", " 720 "),
            ("max_images", "3"),
            ("reader_timeout_ms", "500"),
            ("chroma_filter", "Nearest"),
            ("log", "debug"),
        ]));

        assert_eq!((config.capture.width, config.capture.height), (1280, 720));
        assert_eq!(config.capture.max_images, 3);
        assert_eq!(config.capture.reader_ready_timeout, Duration::from_millis(500));
        assert_eq!(config.chroma_filter, ChromaFilter::Nearest);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = PreviewConfig::from_lookup(lookup(&[
            ("width", "wide"),
            ("height", "0"),
            ("chroma_filter", "bicubic"),
            ("log", "  "),
        ]));

        assert_eq!(config, PreviewConfig::default());
    }
}
