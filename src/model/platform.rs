//! Platform identity: the OS and CPU architecture the overlay runs on.

use serde::{Deserialize, Serialize};

/// Operating system and architecture identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// macOS on Apple Silicon, where the renderer can go blank after a GPU handoff.
    ///
    /// Accepts both Rust's identifiers (`macos`, `aarch64`) and the
    /// Darwin-style ones (`darwin`, `arm64`, `arm64e`).
    pub fn is_apple_silicon(&self) -> bool {
        matches!(self.os.as_str(), "macos" | "darwin")
            && matches!(self.arch.as_str(), "aarch64" | "arm64" | "arm64e")
    }
}
