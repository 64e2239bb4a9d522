//! Kernel objects: per-instance argument binding state built from compiled metadata.
//!
//! A [`Kernel`] owns everything the dispatch stage needs for one launch:
//! - the UAV/SRV/sampler slot tables, sized by [`ShaderDecls`],
//! - the kernel-arguments constant buffer (`cb_data`),
//! - per-argument compiler configuration (local memory sizes, sampler state).
//!
//! Slots bound through [`Kernel::set_arg`] hold non-owning references; the caller keeps bound
//! objects alive until dispatch. Literal samplers and inline constant buffers are created by the
//! kernel itself and live as long as it (and its clones) do.

mod set_arg;

use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::cl_enums::{AddressingMode, FilterMode};
use crate::decls::ShaderDecls;
use crate::error::{KernelError, Result};
use crate::memory::{ImageFormat, MemFlags, MemObject, Sampler, SamplerDesc};
use crate::metadata::{ArgMetadata, ArgProperties, KernelMetadata};
use crate::program::Program;

pub use set_arg::{ArgValue, HANDLE_SIZE};

/// Sampler state the compiler specializes a kernel on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub normalized_coords: bool,
    /// Zero-based addressing mode.
    pub addressing_mode: u32,
    pub linear_filtering: bool,
}

impl SamplerConfig {
    /// Configuration recorded for a sampler argument bound to no sampler.
    pub const UNBOUND: SamplerConfig = SamplerConfig {
        normalized_coords: true,
        addressing_mode: 0,
        linear_filtering: false,
    };

    pub fn from_desc(desc: &SamplerDesc) -> Self {
        Self {
            normalized_coords: desc.normalized_coords,
            addressing_mode: desc.addressing_mode.to_zero_based(),
            linear_filtering: desc.filter_mode == FilterMode::Linear,
        }
    }
}

/// Per-argument state handed to the compiler alongside the binding tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgConfig {
    None,
    /// Bytes of local memory requested for a `__local` argument.
    Local { size: u32 },
    /// `None` until the argument is first set.
    Sampler(Option<SamplerConfig>),
}

#[derive(Debug)]
pub struct Kernel {
    program: Arc<Program>,
    metadata: Arc<KernelMetadata>,
    decls: ShaderDecls,
    uavs: Vec<Option<Weak<MemObject>>>,
    srvs: Vec<Option<Weak<MemObject>>>,
    samplers: Vec<Option<Weak<Sampler>>>,
    arg_configs: Vec<ArgConfig>,
    cb_data: Vec<u8>,
    const_samplers: Vec<Arc<Sampler>>,
    inline_consts: Vec<Arc<MemObject>>,
}

impl Kernel {
    /// Builds a kernel instance from `metadata`, creating its literal samplers and inline
    /// constant buffers in the program's context.
    ///
    /// Nothing is observable on failure: the program's live kernel count only changes once the
    /// kernel is complete.
    pub fn new(program: Arc<Program>, metadata: Arc<KernelMetadata>) -> Result<Kernel> {
        let decls = ShaderDecls::from_metadata(&metadata)?;
        check_layout(&metadata)?;

        let mut uavs = vec![None; decls.uav_decls.len()];
        let srvs = vec![None; decls.srv_decls.len()];
        let mut samplers = vec![None; decls.num_samplers as usize];

        let arg_configs = metadata
            .args
            .iter()
            .map(|arg| match arg.properties {
                ArgProperties::Local => ArgConfig::Local { size: 0 },
                ArgProperties::Sampler { .. } => ArgConfig::Sampler(None),
                _ => ArgConfig::None,
            })
            .collect();

        let cb_data = vec![0u8; metadata.kernel_inputs_buf_size];

        let context = program.context();

        let mut const_samplers = Vec::with_capacity(metadata.const_samplers.len());
        for literal in &metadata.const_samplers {
            let desc = SamplerDesc {
                normalized_coords: literal.normalized_coords,
                addressing_mode: AddressingMode::from_zero_based(literal.addressing_mode)
                    .ok_or_else(|| {
                        KernelError::MalformedMetadata(format!(
                            "literal sampler {} has addressing mode {}",
                            literal.sampler_id, literal.addressing_mode
                        ))
                    })?,
                filter_mode: FilterMode::from_zero_based(literal.filter_mode).ok_or_else(|| {
                    KernelError::MalformedMetadata(format!(
                        "literal sampler {} has filter mode {}",
                        literal.sampler_id, literal.filter_mode
                    ))
                })?,
            };
            let sampler = context.create_sampler(desc)?;
            samplers[literal.sampler_id as usize] = Some(Arc::downgrade(&sampler));
            const_samplers.push(sampler);
        }

        let mut inline_consts = Vec::with_capacity(metadata.consts.len());
        for literal in &metadata.consts {
            let buffer = context.create_buffer(
                MemFlags::COPY_HOST_PTR | MemFlags::READ_ONLY | MemFlags::HOST_NO_ACCESS,
                literal.data.len(),
                Some(&literal.data),
            )?;
            uavs[literal.uav_id as usize] = Some(Arc::downgrade(&buffer));
            inline_consts.push(buffer);
        }

        program.kernel_created();
        debug!(
            kernel = %metadata.name,
            args = metadata.args.len(),
            uavs = uavs.len(),
            srvs = srvs.len(),
            samplers = samplers.len(),
            "created kernel"
        );

        Ok(Kernel {
            program,
            metadata,
            decls,
            uavs,
            srvs,
            samplers,
            arg_configs,
            cb_data,
            const_samplers,
            inline_consts,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn num_args(&self) -> usize {
        self.metadata.args.len()
    }

    pub fn arg(&self, index: u32) -> Option<&ArgMetadata> {
        self.metadata.args.get(index as usize)
    }

    pub fn metadata(&self) -> &Arc<KernelMetadata> {
        &self.metadata
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn decls(&self) -> &ShaderDecls {
        &self.decls
    }

    /// Object bound to UAV slot `slot`, if it is still alive.
    pub fn uav(&self, slot: u32) -> Option<Arc<MemObject>> {
        upgrade_slot(&self.uavs, slot)
    }

    pub fn srv(&self, slot: u32) -> Option<Arc<MemObject>> {
        upgrade_slot(&self.srvs, slot)
    }

    pub fn sampler(&self, slot: u32) -> Option<Arc<Sampler>> {
        upgrade_slot(&self.samplers, slot)
    }

    pub fn uavs(&self) -> impl Iterator<Item = Option<Arc<MemObject>>> + '_ {
        self.uavs.iter().map(|s| s.as_ref().and_then(Weak::upgrade))
    }

    pub fn srvs(&self) -> impl Iterator<Item = Option<Arc<MemObject>>> + '_ {
        self.srvs.iter().map(|s| s.as_ref().and_then(Weak::upgrade))
    }

    pub fn samplers(&self) -> impl Iterator<Item = Option<Arc<Sampler>>> + '_ {
        self.samplers.iter().map(|s| s.as_ref().and_then(Weak::upgrade))
    }

    /// Contents of the kernel-arguments constant buffer.
    pub fn cb_data(&self) -> &[u8] {
        &self.cb_data
    }

    pub fn arg_configs(&self) -> &[ArgConfig] {
        &self.arg_configs
    }

    /// Samplers created from sampler literals in the kernel source.
    pub fn const_samplers(&self) -> &[Arc<Sampler>] {
        &self.const_samplers
    }

    /// Read-only buffers holding constant data hoisted out of the kernel.
    pub fn inline_consts(&self) -> &[Arc<MemObject>] {
        &self.inline_consts
    }

    /// `reqd_work_group_size`, when the kernel declares one.
    pub fn required_local_dims(&self) -> Option<[u16; 3]> {
        let dims = self.metadata.local_size;
        (dims[0] != 0).then_some(dims)
    }

    /// `work_group_size_hint`, when the kernel declares one.
    pub fn local_dims_hint(&self) -> Option<[u16; 3]> {
        let dims = self.metadata.local_size_hint;
        (dims[0] != 0).then_some(dims)
    }

    pub fn compile_work_group_size(&self) -> [usize; 3] {
        self.required_local_dims()
            .map(|d| d.map(usize::from))
            .unwrap_or([0; 3])
    }

    pub fn work_group_size(&self) -> usize {
        self.program.context().config().max_threads_per_group as usize
    }

    pub fn preferred_work_group_size_multiple(&self) -> usize {
        self.program
            .context()
            .config()
            .preferred_work_group_size_multiple as usize
    }

    /// Local memory used by one work-group with the current `__local` argument sizes.
    pub fn local_mem_size(&self) -> usize {
        let (placeholders, requested) = self
            .arg_configs
            .iter()
            .fold((0usize, 0usize), |(n, sum), config| match config {
                ArgConfig::Local { size } => (n + 1, sum + *size as usize),
                _ => (n, sum),
            });
        // The compiler reserves a 4-byte placeholder for every `__local` argument.
        (self.metadata.local_mem_size + requested).saturating_sub(4 * placeholders)
    }

    pub fn private_mem_size(&self) -> usize {
        self.metadata.priv_mem_size
    }
}

impl Clone for Kernel {
    /// Copies the binding state. Bound objects are shared, not duplicated, and the clone counts as
    /// a separate live kernel of the same program.
    fn clone(&self) -> Self {
        self.program.kernel_created();
        trace!(kernel = %self.name(), "cloned kernel");
        Kernel {
            program: self.program.clone(),
            metadata: self.metadata.clone(),
            decls: self.decls.clone(),
            uavs: self.uavs.clone(),
            srvs: self.srvs.clone(),
            samplers: self.samplers.clone(),
            arg_configs: self.arg_configs.clone(),
            cb_data: self.cb_data.clone(),
            const_samplers: self.const_samplers.clone(),
            inline_consts: self.inline_consts.clone(),
        }
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.program.kernel_freed();
        trace!(kernel = %self.name(), "released kernel");
    }
}

fn upgrade_slot<T>(slots: &[Option<Weak<T>>], slot: u32) -> Option<Arc<T>> {
    slots.get(slot as usize)?.as_ref()?.upgrade()
}

/// Checks every id and offset binding will index with, so `set_arg` cannot go out of bounds.
///
/// UAV/SRV ids of arguments are covered by [`ShaderDecls::from_metadata`].
fn check_layout(metadata: &KernelMetadata) -> Result<()> {
    let malformed = |msg: String| Err(KernelError::MalformedMetadata(msg));
    let cb_size = metadata.kernel_inputs_buf_size;
    let fits = |offset: u32, size: usize| {
        (offset as usize)
            .checked_add(size)
            .is_some_and(|end| end <= cb_size)
    };

    for (index, arg) in metadata.args.iter().enumerate() {
        let expected = arg.info.classify();
        if arg.properties.kind() != expected {
            return malformed(format!(
                "argument {index} (`{}`) should be {expected:?} but has {:?} properties",
                arg.info.type_name,
                arg.properties.kind()
            ));
        }
        let in_range = match arg.properties {
            ArgProperties::Image { offset, .. } => fits(offset, ImageFormat::HEADER_SIZE),
            ArgProperties::Memory { offset, .. } => fits(offset, std::mem::size_of::<u64>()),
            ArgProperties::Scalar { offset, size } => fits(offset, size as usize),
            ArgProperties::Sampler { sampler_id } => sampler_id < metadata.num_samplers,
            ArgProperties::Local => true,
        };
        if !in_range {
            return malformed(format!("argument {index} lies outside its binding table"));
        }
    }

    if let Some(s) = metadata
        .const_samplers
        .iter()
        .find(|s| s.sampler_id >= metadata.num_samplers)
    {
        return malformed(format!("literal sampler uses undeclared slot {}", s.sampler_id));
    }
    if let Some(c) = metadata.consts.iter().find(|c| c.uav_id >= metadata.num_uavs) {
        return malformed(format!("inline constant uses undeclared UAV slot {}", c.uav_id));
    }
    Ok(())
}
