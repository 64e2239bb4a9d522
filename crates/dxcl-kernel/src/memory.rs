//! Memory objects, samplers, and the context that creates them.
//!
//! Only the properties argument binding inspects are modeled here: access flags, object kind, the
//! pixel format of images and a host copy of the initial contents. Placement and residency belong
//! to the dispatch layer.

use std::sync::Arc;

use bitflags::bitflags;
use tracing::trace;

use crate::cl_enums::{AddressingMode, ChannelOrder, ChannelType, FilterMode, MemObjectType};
use crate::config::ContextConfig;
use crate::error::ResourceError;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct MemFlags: u64 {
        const READ_WRITE = 1 << 0;
        const WRITE_ONLY = 1 << 1;
        const READ_ONLY = 1 << 2;
        const USE_HOST_PTR = 1 << 3;
        const ALLOC_HOST_PTR = 1 << 4;
        const COPY_HOST_PTR = 1 << 5;
        const HOST_WRITE_ONLY = 1 << 7;
        const HOST_READ_ONLY = 1 << 8;
        const HOST_NO_ACCESS = 1 << 9;
    }
}

impl MemFlags {
    const DEVICE_ACCESS: MemFlags = MemFlags::READ_WRITE
        .union(MemFlags::WRITE_ONLY)
        .union(MemFlags::READ_ONLY);
    const HOST_ACCESS: MemFlags = MemFlags::HOST_WRITE_ONLY
        .union(MemFlags::HOST_READ_ONLY)
        .union(MemFlags::HOST_NO_ACCESS);

    fn validate(self) -> Result<MemFlags, ResourceError> {
        if (self & Self::DEVICE_ACCESS).bits().count_ones() > 1 {
            return Err(ResourceError::InvalidFlags("conflicting device access flags"));
        }
        if (self & Self::HOST_ACCESS).bits().count_ones() > 1 {
            return Err(ResourceError::InvalidFlags("conflicting host access flags"));
        }
        if self.contains(MemFlags::USE_HOST_PTR)
            && self.intersects(MemFlags::ALLOC_HOST_PTR | MemFlags::COPY_HOST_PTR)
        {
            return Err(ResourceError::InvalidFlags("USE_HOST_PTR excludes host allocation flags"));
        }
        // READ_WRITE is the default device access.
        if !self.intersects(Self::DEVICE_ACCESS) {
            return Ok(self | MemFlags::READ_WRITE);
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub channel_order: ChannelOrder,
    pub channel_data_type: ChannelType,
}

impl ImageFormat {
    /// Size of the format header stored in the kernel-arguments buffer.
    pub const HEADER_SIZE: usize = 8;

    /// Device-side format header: channel order then channel data type, each as a zero-based
    /// little-endian `u32`.
    pub fn device_header(&self) -> [u8; Self::HEADER_SIZE] {
        let mut header = [0u8; Self::HEADER_SIZE];
        header[0..4].copy_from_slice(&self.channel_order.to_zero_based().to_le_bytes());
        header[4..8].copy_from_slice(&self.channel_data_type.to_zero_based().to_le_bytes());
        header
    }
}

#[derive(Debug)]
pub struct MemObject {
    kind: MemObjectType,
    flags: MemFlags,
    format: Option<ImageFormat>,
    size: usize,
    contents: Vec<u8>,
}

impl MemObject {
    pub fn kind(&self) -> MemObjectType {
        self.kind
    }

    pub fn flags(&self) -> MemFlags {
        self.flags
    }

    /// Pixel format; `None` for plain buffers.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Initial contents supplied at creation (zero-filled when none were given).
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(MemFlags::READ_ONLY)
    }

    pub fn is_write_only(&self) -> bool {
        self.flags.contains(MemFlags::WRITE_ONLY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub normalized_coords: bool,
    pub addressing_mode: AddressingMode,
    pub filter_mode: FilterMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            normalized_coords: true,
            addressing_mode: AddressingMode::None,
            filter_mode: FilterMode::Nearest,
        }
    }
}

#[derive(Debug)]
pub struct Sampler {
    desc: SamplerDesc,
}

impl Sampler {
    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

/// Owner of device limits and factory for memory objects and samplers.
#[derive(Debug, Default)]
pub struct Context {
    config: ContextConfig,
}

impl Context {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Creates a buffer of `size` bytes.
    ///
    /// With `COPY_HOST_PTR`, the first `size` bytes of `host_data` become the initial contents.
    pub fn create_buffer(
        &self,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Arc<MemObject>, ResourceError> {
        self.create_mem_object(MemObjectType::Buffer, flags, None, size, host_data)
    }

    pub fn create_image(
        &self,
        flags: MemFlags,
        image_type: MemObjectType,
        format: ImageFormat,
        size: usize,
    ) -> Result<Arc<MemObject>, ResourceError> {
        if image_type == MemObjectType::Buffer {
            return Err(ResourceError::InvalidFlags("image type must not be BUFFER"));
        }
        self.create_mem_object(image_type, flags, Some(format), size, None)
    }

    pub fn create_sampler(&self, desc: SamplerDesc) -> Result<Arc<Sampler>, ResourceError> {
        trace!(?desc, "creating sampler");
        Ok(Arc::new(Sampler { desc }))
    }

    fn create_mem_object(
        &self,
        kind: MemObjectType,
        flags: MemFlags,
        format: Option<ImageFormat>,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Arc<MemObject>, ResourceError> {
        let flags = flags.validate()?;
        if size == 0 {
            return Err(ResourceError::InvalidBufferSize { size });
        }
        if size as u64 > self.config.max_mem_alloc_size {
            return Err(ResourceError::AllocationTooLarge {
                size,
                max: self.config.max_mem_alloc_size,
            });
        }

        let contents = if flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR) {
            let data = host_data.ok_or(ResourceError::MissingHostData)?;
            let initial = data.get(..size).ok_or(ResourceError::HostDataTooSmall {
                size,
                provided: data.len(),
            })?;
            initial.to_vec()
        } else {
            vec![0u8; size]
        };

        trace!(?kind, ?flags, size, "creating memory object");
        Ok(Arc::new(MemObject {
            kind,
            flags,
            format,
            size,
            contents,
        }))
    }
}
