//! Builders for synthetic kernel metadata.
//!
//! Slot ids and constant-buffer offsets are handed out in declaration order, the way the compiler
//! lays them out: UAVs, SRVs and samplers are numbered from zero, and every argument with a
//! constant-buffer footprint gets an 8-byte aligned offset.

use crate::metadata::{
    AddressSpace, ArgInfo, ArgMetadata, ArgProperties, ArgQualifiers, ConstSamplerMetadata,
    InlineConstMetadata, KernelMetadata,
};

pub use crate::metadata::ArgQualifiers as Q;

#[derive(Debug, Clone)]
pub struct KernelBuilder {
    meta: KernelMetadata,
    cb_offset: u32,
}

impl KernelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            meta: KernelMetadata {
                name: name.into(),
                kernel_inputs_cbv_id: 0,
                work_properties_cbv_id: 1,
                ..KernelMetadata::default()
            },
            cb_offset: 0,
        }
    }

    fn cb_alloc(&mut self, size: u32) -> u32 {
        let offset = self.cb_offset.next_multiple_of(8);
        self.cb_offset = offset + size;
        offset
    }

    fn next_uav(&mut self) -> u32 {
        self.meta.num_uavs += 1;
        self.meta.num_uavs - 1
    }

    fn next_srv(&mut self) -> u32 {
        self.meta.num_srvs += 1;
        self.meta.num_srvs - 1
    }

    fn next_sampler(&mut self) -> u32 {
        self.meta.num_samplers += 1;
        self.meta.num_samplers - 1
    }

    fn push(
        mut self,
        name: &str,
        type_name: &str,
        address_space: AddressSpace,
        qualifiers: ArgQualifiers,
        properties: ArgProperties,
    ) -> Self {
        self.meta.args.push(ArgMetadata {
            info: ArgInfo {
                name: Some(name.into()),
                type_name: type_name.into(),
                address_space,
                qualifiers,
            },
            properties,
        });
        self
    }

    /// `__global float*` argument.
    pub fn buffer(mut self, name: &str, qualifiers: ArgQualifiers) -> Self {
        let buffer_id = self.next_uav();
        let offset = self.cb_alloc(8);
        self.push(
            name,
            "float*",
            AddressSpace::Global,
            qualifiers,
            ArgProperties::Memory { buffer_id, offset },
        )
    }

    /// `__constant float*` argument.
    pub fn constant_buffer(mut self, name: &str) -> Self {
        let buffer_id = self.next_uav();
        let offset = self.cb_alloc(8);
        self.push(
            name,
            "float*",
            AddressSpace::Constant,
            ArgQualifiers::CONST,
            ArgProperties::Memory { buffer_id, offset },
        )
    }

    pub fn image(self, name: &str, type_name: &str, qualifiers: ArgQualifiers) -> Self {
        self.image_planes(name, type_name, qualifiers, 1)
    }

    /// Image argument spanning `planes` resource ids.
    pub fn image_planes(
        mut self,
        name: &str,
        type_name: &str,
        qualifiers: ArgQualifiers,
        planes: u32,
    ) -> Self {
        let writable = qualifiers.contains(ArgQualifiers::WRITABLE);
        let buffer_ids = (0..planes)
            .map(|_| if writable { self.next_uav() } else { self.next_srv() })
            .collect();
        let offset = self.cb_alloc(8);
        self.push(
            name,
            type_name,
            AddressSpace::Global,
            qualifiers,
            ArgProperties::Image { buffer_ids, offset },
        )
    }

    pub fn sampler(mut self, name: &str) -> Self {
        let sampler_id = self.next_sampler();
        self.push(
            name,
            "sampler_t",
            AddressSpace::Private,
            ArgQualifiers::empty(),
            ArgProperties::Sampler { sampler_id },
        )
    }

    pub fn scalar(mut self, name: &str, type_name: &str, size: u32) -> Self {
        let offset = self.cb_alloc(size);
        self.push(
            name,
            type_name,
            AddressSpace::Private,
            ArgQualifiers::empty(),
            ArgProperties::Scalar { offset, size },
        )
    }

    /// `__local` pointer argument; contributes the compiler's 4-byte placeholder.
    pub fn local(mut self, name: &str) -> Self {
        self.meta.local_mem_size += 4;
        self.push(
            name,
            "float*",
            AddressSpace::Local,
            ArgQualifiers::empty(),
            ArgProperties::Local,
        )
    }

    /// Literal sampler; modes use the compiler's zero-based numbering.
    pub fn const_sampler(
        mut self,
        normalized_coords: bool,
        addressing_mode: u32,
        filter_mode: u32,
    ) -> Self {
        let sampler_id = self.next_sampler();
        self.meta.const_samplers.push(ConstSamplerMetadata {
            sampler_id,
            normalized_coords,
            addressing_mode,
            filter_mode,
        });
        self
    }

    pub fn inline_const(mut self, data: &[u8]) -> Self {
        let uav_id = self.next_uav();
        self.meta.consts.push(InlineConstMetadata {
            uav_id,
            data: data.to_vec(),
        });
        self
    }

    pub fn static_local_mem(mut self, bytes: usize) -> Self {
        self.meta.local_mem_size += bytes;
        self
    }

    pub fn required_local_size(mut self, size: [u16; 3]) -> Self {
        self.meta.local_size = size;
        self
    }

    pub fn local_size_hint(mut self, size: [u16; 3]) -> Self {
        self.meta.local_size_hint = size;
        self
    }

    pub fn build(mut self) -> KernelMetadata {
        self.meta.kernel_inputs_buf_size = self.cb_offset.next_multiple_of(16) as usize;
        self.meta
    }
}
