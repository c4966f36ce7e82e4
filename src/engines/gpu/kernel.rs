//! Compute kernel source text.

use std::path::Path;

use crate::core::IntegrationError;

/// Entry point every kernel source must define.
pub const KERNEL_ENTRY_POINT: &str = "matecarlo";

/// WGSL program text plus a label used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    label: String,
    text: String,
}

impl KernelSource {
    /// Kernel shipped inside the crate.
    pub fn builtin() -> Self {
        Self::from_wgsl("builtin matecarlo.wgsl", include_str!("matecarlo.wgsl"))
    }

    pub fn from_wgsl(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Reads a kernel from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IntegrationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IntegrationError::KernelIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_wgsl(path.display().to_string(), text))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for KernelSource {
    fn default() -> Self {
        Self::builtin()
    }
}
