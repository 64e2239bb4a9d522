//! Kernel creation by name across the devices a program was built for.
//!
//! A program built for several devices yields one compiled artifact per device. They are exposed
//! as a single kernel only if every device that has the kernel agrees on its argument signature.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{KernelError, Result};
use crate::kernel::Kernel;
use crate::metadata::KernelMetadata;
use crate::program::{Program, ProgramBuilds};

/// Creates the kernel `name` from `program`.
pub fn create_kernel(program: &Arc<Program>, name: &str) -> Result<Kernel> {
    // Resolution is serialized against rebuilds; construction works from the selected metadata,
    // which stays valid after the lock is released.
    let metadata = {
        let builds = program.lock_builds();
        resolve_metadata(&builds, name)
    };
    let metadata = metadata.inspect_err(|err| {
        debug!(kernel = name, %err, "kernel resolution failed");
    })?;

    Kernel::new(program.clone(), metadata)
}

/// Creates one kernel for every kernel name exposed by any built executable, ordered by name.
pub fn create_kernels_in_program(program: &Arc<Program>) -> Result<Vec<Kernel>> {
    let names = {
        let builds = program.lock_builds();
        let names: BTreeSet<String> = builds
            .iter()
            .filter_map(|(_, build)| build.filter(|b| b.has_executable()))
            .flat_map(|build| build.kernels.keys().cloned())
            .collect();
        names
    };
    if names.is_empty() {
        debug!("no executable available for program");
        return Err(KernelError::InvalidProgramExecutable);
    }

    names
        .iter()
        .map(|name| create_kernel(program, name))
        .collect()
}

/// Picks the metadata for `name`, checking that every device exposing it agrees on the
/// signature. The first device with the kernel provides the metadata.
pub fn resolve_metadata(builds: &ProgramBuilds, name: &str) -> Result<Arc<KernelMetadata>> {
    let mut devices_with_program = 0u32;
    let mut reference: Option<&Arc<KernelMetadata>> = None;

    for (device, build) in builds.iter() {
        let Some(build) = build.filter(|b| b.has_executable()) else {
            continue;
        };
        devices_with_program += 1;

        let Some(compiled) = build.kernels.get(name) else {
            continue;
        };
        let compiled = compiled
            .as_ref()
            .ok_or_else(|| KernelError::KernelNotCompiled(name.to_owned()))?;

        match reference {
            Some(first) => check_signatures(first, compiled).inspect_err(|_| {
                debug!(
                    kernel = name,
                    device = device.id,
                    "kernel signature differs between devices"
                );
            })?,
            None => reference = Some(compiled),
        }
    }

    if devices_with_program == 0 {
        return Err(KernelError::InvalidProgramExecutable);
    }
    reference
        .cloned()
        .ok_or_else(|| KernelError::InvalidKernelName(name.to_owned()))
}

fn check_signatures(a: &KernelMetadata, b: &KernelMetadata) -> Result<()> {
    let mismatch = |reason| KernelError::InvalidKernelDefinition {
        name: a.name.clone(),
        reason,
    };
    if a.args.len() != b.args.len() {
        return Err(mismatch("argument count differs between devices"));
    }
    if a
        .args
        .iter()
        .zip(&b.args)
        .any(|(x, y)| !x.info.signature_matches(&y.info))
    {
        return Err(mismatch("argument differs between devices"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::memory::Context;
    use crate::program::{BinaryType, BuildStatus, Device, DeviceBuild};
    use crate::test_utils::{KernelBuilder, Q};

    fn devices(n: u32) -> Vec<Arc<Device>> {
        (0..n)
            .map(|id| {
                Arc::new(Device {
                    id,
                    name: format!("gpu{id}"),
                })
            })
            .collect()
    }

    fn program_with(builds: Vec<Option<DeviceBuild>>) -> Arc<Program> {
        let devs = devices(builds.len() as u32);
        let program = Arc::new(Program::new(Arc::new(Context::default()), devs.clone()));
        for (device, build) in devs.iter().zip(builds) {
            if let Some(build) = build {
                program.set_device_build(device, build).unwrap();
            }
        }
        program
    }

    fn add_kernel() -> KernelBuilder {
        KernelBuilder::new("add")
            .buffer("a", Q::READABLE)
            .buffer("b", Q::READABLE)
            .buffer("out", Q::WRITABLE)
            .scalar("n", "uint", 4)
    }

    #[test]
    fn first_device_with_kernel_provides_metadata() {
        let first = add_kernel().build();
        let mut second = add_kernel().build();
        second.priv_mem_size = 99;
        let program = program_with(vec![
            Some(DeviceBuild::executable([first])),
            Some(DeviceBuild::executable([second])),
        ]);

        let builds = program.lock_builds();
        let meta = resolve_metadata(&builds, "add").unwrap();
        assert_eq!(meta.priv_mem_size, 0);
    }

    #[test]
    fn unbuilt_devices_are_skipped() {
        let failed = DeviceBuild {
            status: BuildStatus::Error,
            binary_type: BinaryType::None,
            kernels: Default::default(),
        };
        let mut different = add_kernel().build();
        different.args.pop();
        let mut library = DeviceBuild::executable([different]);
        library.binary_type = BinaryType::Library;

        let program = program_with(vec![
            None,
            Some(failed),
            Some(library),
            Some(DeviceBuild::executable([add_kernel().build()])),
        ]);
        let builds = program.lock_builds();
        assert!(resolve_metadata(&builds, "add").is_ok());
    }

    #[test]
    fn no_executable_is_distinct_from_unknown_name() {
        let program = program_with(vec![None, None]);
        assert_eq!(
            resolve_metadata(&program.lock_builds(), "add").unwrap_err(),
            KernelError::InvalidProgramExecutable
        );

        let program = program_with(vec![Some(DeviceBuild::executable([add_kernel().build()]))]);
        assert_eq!(
            resolve_metadata(&program.lock_builds(), "mul").unwrap_err(),
            KernelError::InvalidKernelName("mul".into())
        );
    }

    #[test]
    fn argument_count_mismatch() {
        let mut short = add_kernel().build();
        short.args.pop();
        let program = program_with(vec![
            Some(DeviceBuild::executable([add_kernel().build()])),
            Some(DeviceBuild::executable([short])),
        ]);
        let err = resolve_metadata(&program.lock_builds(), "add").unwrap_err();
        assert_eq!(
            err,
            KernelError::InvalidKernelDefinition {
                name: "add".into(),
                reason: "argument count differs between devices",
            }
        );
    }

    #[test]
    fn kernel_missing_on_one_device_is_not_a_mismatch() {
        let program = program_with(vec![
            Some(DeviceBuild::executable([KernelBuilder::new("other").build()])),
            Some(DeviceBuild::executable([add_kernel().build()])),
        ]);
        assert!(resolve_metadata(&program.lock_builds(), "add").is_ok());
    }

    #[test]
    fn failed_device_compile_is_out_of_resources() {
        let mut build = DeviceBuild::executable([]);
        build.kernels.insert("add".into(), None);
        let program = program_with(vec![Some(build)]);
        let err = resolve_metadata(&program.lock_builds(), "add").unwrap_err();
        assert_eq!(err, KernelError::KernelNotCompiled("add".into()));
        assert_eq!(err.code(), crate::error::status::OUT_OF_RESOURCES);
    }
}
