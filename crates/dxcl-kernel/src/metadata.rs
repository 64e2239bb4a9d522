//! Compiler-produced kernel metadata.
//!
//! One [`KernelMetadata`] exists per (device, kernel) pair once a program has been built. It is
//! immutable and shared (`Arc`) by every kernel object created from it, so a program rebuild can
//! replace the per-device tables without invalidating kernels that already reference the old
//! metadata.

use bitflags::bitflags;

use crate::cl_enums::{image_type_from_name, MemObjectType, SAMPLER_TYPE_NAME};

/// Storage class of a kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    Global,
    Constant,
    Private,
    Local,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct ArgQualifiers: u32 {
        const CONST = 1 << 0;
        const RESTRICT = 1 << 1;
        const VOLATILE = 1 << 2;
        const READABLE = 1 << 3;
        const WRITABLE = 1 << 4;
    }
}

/// Image access qualifier derived from the readable/writable qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessQualifier {
    None,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Source-level description of one kernel argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInfo {
    /// Argument name; absent when the program was built without argument info.
    pub name: Option<String>,
    pub type_name: String,
    pub address_space: AddressSpace,
    pub qualifiers: ArgQualifiers,
}

impl ArgInfo {
    pub fn is_readable(&self) -> bool {
        self.qualifiers.contains(ArgQualifiers::READABLE)
    }

    pub fn is_writable(&self) -> bool {
        self.qualifiers.contains(ArgQualifiers::WRITABLE)
    }

    pub fn access_qualifier(&self) -> AccessQualifier {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => AccessQualifier::ReadWrite,
            (false, true) => AccessQualifier::WriteOnly,
            (true, false) => AccessQualifier::ReadOnly,
            (false, false) => AccessQualifier::None,
        }
    }

    /// Type qualifiers as seen by the application. `__constant` pointers are implicitly const.
    pub fn type_qualifier(&self) -> ArgQualifiers {
        let mut q = self.qualifiers
            & (ArgQualifiers::CONST | ArgQualifiers::RESTRICT | ArgQualifiers::VOLATILE);
        if self.address_space == AddressSpace::Constant {
            q |= ArgQualifiers::CONST;
        }
        q
    }

    /// Image kind for global/constant image arguments.
    pub fn image_type(&self) -> Option<MemObjectType> {
        match self.address_space {
            AddressSpace::Global | AddressSpace::Constant => image_type_from_name(&self.type_name),
            AddressSpace::Private | AddressSpace::Local => None,
        }
    }

    pub fn is_sampler(&self) -> bool {
        self.address_space == AddressSpace::Private && self.type_name == SAMPLER_TYPE_NAME
    }

    /// Whether two devices agree on this argument's logical signature.
    pub fn signature_matches(&self, other: &ArgInfo) -> bool {
        self.type_name == other.type_name
            && self.name == other.name
            && self.address_space == other.address_space
            && self.qualifiers == other.qualifiers
    }

    /// Binding kind implied by the address space and type name.
    pub fn classify(&self) -> ArgKind {
        match self.address_space {
            AddressSpace::Global | AddressSpace::Constant => match self.image_type() {
                Some(_) => ArgKind::Image,
                None => ArgKind::Memory,
            },
            AddressSpace::Private if self.is_sampler() => ArgKind::Sampler,
            AddressSpace::Private => ArgKind::Scalar,
            AddressSpace::Local => ArgKind::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Image,
    Memory,
    Sampler,
    Local,
    Scalar,
}

/// Compiler-assigned binding locations for one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgProperties {
    /// Multi-plane formats occupy several resource ids; all of them receive the same binding.
    Image { buffer_ids: Vec<u32>, offset: u32 },
    Memory { buffer_id: u32, offset: u32 },
    Sampler { sampler_id: u32 },
    Local,
    Scalar { offset: u32, size: u32 },
}

impl ArgProperties {
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Image { .. } => ArgKind::Image,
            Self::Memory { .. } => ArgKind::Memory,
            Self::Sampler { .. } => ArgKind::Sampler,
            Self::Local => ArgKind::Local,
            Self::Scalar { .. } => ArgKind::Scalar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgMetadata {
    pub info: ArgInfo,
    pub properties: ArgProperties,
}

/// A sampler literal embedded in the kernel source.
///
/// `addressing_mode` and `filter_mode` use the compiler's zero-based numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstSamplerMetadata {
    pub sampler_id: u32,
    pub normalized_coords: bool,
    pub addressing_mode: u32,
    pub filter_mode: u32,
}

/// Constant data the compiler hoisted out of the kernel into its own read-only buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineConstMetadata {
    pub uav_id: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KernelMetadata {
    pub name: String,
    pub args: Vec<ArgMetadata>,
    pub kernel_inputs_cbv_id: u32,
    pub work_properties_cbv_id: u32,
    /// Size in bytes of the kernel-arguments constant buffer.
    pub kernel_inputs_buf_size: usize,
    pub num_uavs: u32,
    pub num_srvs: u32,
    pub num_samplers: u32,
    pub const_samplers: Vec<ConstSamplerMetadata>,
    pub consts: Vec<InlineConstMetadata>,
    /// `reqd_work_group_size`; all zero when not specified.
    pub local_size: [u16; 3],
    /// `work_group_size_hint`; all zero when not specified.
    pub local_size_hint: [u16; 3],
    /// Static local memory, including a 4-byte placeholder per `__local` argument.
    pub local_mem_size: usize,
    pub priv_mem_size: usize,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn info(type_name: &str, address_space: AddressSpace, qualifiers: ArgQualifiers) -> ArgInfo {
        ArgInfo {
            name: Some("a".into()),
            type_name: type_name.into(),
            address_space,
            qualifiers,
        }
    }

    #[test]
    fn classify_by_address_space_and_type_name() {
        let q = ArgQualifiers::empty();
        assert_eq!(info("image2d_t", AddressSpace::Global, q).classify(), ArgKind::Image);
        assert_eq!(info("float*", AddressSpace::Global, q).classify(), ArgKind::Memory);
        assert_eq!(info("float*", AddressSpace::Constant, q).classify(), ArgKind::Memory);
        assert_eq!(info("sampler_t", AddressSpace::Private, q).classify(), ArgKind::Sampler);
        assert_eq!(info("int", AddressSpace::Private, q).classify(), ArgKind::Scalar);
        assert_eq!(info("float*", AddressSpace::Local, q).classify(), ArgKind::Local);
        // Image names only count for pointer-like address spaces.
        assert_eq!(info("image2d_t", AddressSpace::Private, q).classify(), ArgKind::Scalar);
    }

    #[test]
    fn constant_address_space_implies_const() {
        let a = info("float*", AddressSpace::Constant, ArgQualifiers::RESTRICT);
        assert_eq!(a.type_qualifier(), ArgQualifiers::CONST | ArgQualifiers::RESTRICT);

        let b = info("float*", AddressSpace::Global, ArgQualifiers::READABLE);
        assert_eq!(b.type_qualifier(), ArgQualifiers::empty());
    }

    #[test]
    fn access_qualifier_from_flags() {
        let rw = info(
            "image2d_t",
            AddressSpace::Global,
            ArgQualifiers::READABLE | ArgQualifiers::WRITABLE,
        );
        assert_eq!(rw.access_qualifier(), AccessQualifier::ReadWrite);
        let wo = info("image2d_t", AddressSpace::Global, ArgQualifiers::WRITABLE);
        assert_eq!(wo.access_qualifier(), AccessQualifier::WriteOnly);
    }

    #[test]
    fn signature_compares_every_field() {
        let base = info("float*", AddressSpace::Global, ArgQualifiers::READABLE);
        assert!(base.signature_matches(&base.clone()));

        let mut renamed = base.clone();
        renamed.name = Some("b".into());
        assert!(!base.signature_matches(&renamed));

        let mut volatile = base.clone();
        volatile.qualifiers |= ArgQualifiers::VOLATILE;
        assert!(!base.signature_matches(&volatile));

        let mut constant = base.clone();
        constant.address_space = AddressSpace::Constant;
        assert!(!base.signature_matches(&constant));
    }
}
