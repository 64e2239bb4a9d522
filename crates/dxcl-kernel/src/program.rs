//! Programs and their per-device builds.
//!
//! A [`Program`] tracks how many kernels were created from it and refuses to replace a device
//! build while any of them is alive.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{KernelError, Result};
use crate::memory::Context;
use crate::metadata::KernelMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    None,
    InProgress,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryType {
    None,
    CompiledObject,
    Library,
    Executable,
}

/// Result of building a program for one device.
#[derive(Debug, Clone)]
pub struct DeviceBuild {
    pub status: BuildStatus,
    pub binary_type: BinaryType,
    /// Kernels exposed by the binary. `None` marks a kernel whose device compile failed.
    pub kernels: BTreeMap<String, Option<Arc<KernelMetadata>>>,
}

impl DeviceBuild {
    pub fn executable(kernels: impl IntoIterator<Item = KernelMetadata>) -> Self {
        Self {
            status: BuildStatus::Success,
            binary_type: BinaryType::Executable,
            kernels: kernels
                .into_iter()
                .map(|k| (k.name.clone(), Some(Arc::new(k))))
                .collect(),
        }
    }

    /// Whether this build produced an executable kernels can be created from.
    pub fn has_executable(&self) -> bool {
        self.status == BuildStatus::Success && self.binary_type == BinaryType::Executable
    }
}

/// Per-device build table, in device association order.
#[derive(Debug, Default)]
pub struct ProgramBuilds {
    pub(crate) devices: Vec<(Arc<Device>, Option<DeviceBuild>)>,
}

impl ProgramBuilds {
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Device>, Option<&DeviceBuild>)> {
        self.devices.iter().map(|(device, build)| (device, build.as_ref()))
    }
}

/// A program associated with one or more devices.
///
/// Kernels hold an `Arc<Program>` and report their creation and destruction through
/// `kernel_created` / `kernel_freed`; the live count blocks rebuilds.
#[derive(Debug)]
pub struct Program {
    context: Arc<Context>,
    builds: Mutex<ProgramBuilds>,
    live_kernels: AtomicU32,
}

impl Program {
    pub fn new(context: Arc<Context>, devices: impl IntoIterator<Item = Arc<Device>>) -> Self {
        let devices = devices.into_iter().map(|d| (d, None)).collect();
        Self {
            context,
            builds: Mutex::new(ProgramBuilds { devices }),
            live_kernels: AtomicU32::new(0),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Locks the build table. Kernel resolution holds this for its whole scan.
    pub fn lock_builds(&self) -> MutexGuard<'_, ProgramBuilds> {
        // The table is replaced wholesale, so a panic while it was held cannot leave it torn.
        self.builds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the build result for `device`.
    ///
    /// Fails while kernels created from this program are alive, and for devices the program is
    /// not associated with.
    pub fn set_device_build(&self, device: &Device, build: DeviceBuild) -> Result<()> {
        let mut builds = self.lock_builds();
        let live = self.live_kernel_count();
        if live != 0 {
            debug!(device = device.id, live, "rejecting rebuild with live kernels");
            return Err(KernelError::KernelsAttached(live));
        }
        let slot = builds
            .devices
            .iter_mut()
            .find(|(d, _)| **d == *device)
            .ok_or(KernelError::UnknownDevice(device.id))?;
        slot.1 = Some(build);
        Ok(())
    }

    pub fn live_kernel_count(&self) -> u32 {
        self.live_kernels.load(Ordering::Acquire)
    }

    pub(crate) fn kernel_created(&self) {
        self.live_kernels.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn kernel_freed(&self) {
        self.live_kernels.fetch_sub(1, Ordering::AcqRel);
    }
}
