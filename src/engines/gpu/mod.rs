//! GPU-parallel Monte Carlo integration via wgpu compute shaders.
//!
//! When enabled via the `gpu` feature flag, [`GpuBackend`] runs one shader
//! invocation per worker on any Vulkan/Metal/DX12 adapter. Kernel source
//! handling is always available so the text can be validated and shipped
//! without the feature.

mod kernel;

pub use kernel::{KERNEL_ENTRY_POINT, KernelSource};

#[cfg(feature = "gpu")]
mod gpu_mc;

#[cfg(feature = "gpu")]
pub use gpu_mc::GpuBackend;
