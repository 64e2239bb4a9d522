//! `dxcl-kernel` implements kernel argument binding for an OpenCL-style compute runtime layered
//! on D3D12-style binding tables.
//!
//! Given compiled kernel metadata it:
//! - derives the UAV/SRV/sampler/constant-buffer declarations of the kernel (see [`ShaderDecls`]),
//! - creates kernel-owned literal samplers and inline constant buffers,
//! - validates and applies `set_arg` calls into slot tables and the kernel-arguments constant
//!   buffer (see [`Kernel::set_arg`]),
//! - resolves kernels by name across every device a program was built for, rejecting kernels
//!   whose argument signatures differ between devices (see [`create_kernel`]).
//!
//! Dispatch, memory residency and program compilation are handled elsewhere; this crate only
//! produces the state a dispatch consumes.

pub mod cl_enums;
mod config;
mod decls;
mod error;
pub mod kernel;
mod memory;
pub mod metadata;
mod program;
mod resolve;

/// Helpers for building synthetic kernel metadata in tests.
///
/// Only available when compiling this crate's own tests, or when the `test-utils` feature is
/// enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::config::ContextConfig;
pub use crate::decls::ShaderDecls;
pub use crate::error::{status, KernelError, ResourceError, Result};
pub use crate::kernel::{ArgConfig, ArgValue, Kernel, SamplerConfig, HANDLE_SIZE};
pub use crate::memory::{Context, ImageFormat, MemFlags, MemObject, Sampler, SamplerDesc};
pub use crate::program::{BinaryType, BuildStatus, Device, DeviceBuild, Program, ProgramBuilds};
pub use crate::resolve::{create_kernel, create_kernels_in_program, resolve_metadata};
