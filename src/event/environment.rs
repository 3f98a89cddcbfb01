use std::env;

/// Static properties describing the installation environment.
///
/// Detected once at process start and treated as immutable afterwards;
/// every dispatched event carries them as user properties.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Two-letter region code, "XX" when undetectable
    pub device_region: String,

    /// BCP 47-style language tag, e.g. "en-US"
    pub language: String,

    /// Application version reported to the collector
    pub app_version: String,

    /// Operating system identifier, e.g. "linux", "macos", "windows"
    pub platform: String,

    /// Primary display resolution, "unknown" when the host does not supply it
    pub screen_resolution: String,
}

impl Environment {
    /// Detect environment properties from the process locale and build
    /// metadata. Hosts that know more (display metrics, their own version
    /// string) can override fields with the builder methods.
    pub fn detect() -> Self {
        let locale = locale_from_env();

        Self {
            device_region: region_of(locale.as_deref()),
            language: language_of(locale.as_deref()),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: env::consts::OS.to_string(),
            screen_resolution: "unknown".to_string(),
        }
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    pub fn with_screen_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.screen_resolution = resolution.into();
        self
    }
}

/// First non-empty POSIX locale variable, ignoring the C/POSIX defaults.
fn locale_from_env() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|key| env::var(key).ok().filter(|v| !v.is_empty()))
        .filter(|v| v != "POSIX" && v != "C" && !v.starts_with("C."))
}

/// "en_US.UTF-8" -> "en-US"
fn language_of(locale: Option<&str>) -> String {
    match locale {
        Some(raw) => {
            let tag = raw.split('.').next().unwrap_or(raw);
            tag.replace('_', "-")
        }
        None => "en-US".to_string(),
    }
}

/// "en_US.UTF-8" -> "US"
fn region_of(locale: Option<&str>) -> String {
    locale
        .and_then(|raw| {
            let tag = raw.split('.').next().unwrap_or(raw);
            tag.split('_').nth(1).map(|region| region.to_string())
        })
        .unwrap_or_else(|| "XX".to_string())
}
