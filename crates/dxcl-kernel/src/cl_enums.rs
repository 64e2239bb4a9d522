//! Closed enumerations shared between the API surface, the compiler metadata and the device-side
//! argument encoding.
//!
//! The public API numbers most of these enumerations from a non-zero base (e.g. `CL_R = 0x10B0`),
//! while compiled kernels expect the same values re-based to zero. Both directions are generated
//! from a single table per enumeration so they cannot drift apart.

macro_rules! cl_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr,)+
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            /// Every enumerator, in ascending numeric order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Numeric value of the first enumerator; the zero point of the device encoding.
            pub const FIRST: u32 = Self::ALL[0] as u32;

            pub const fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub const fn raw(self) -> u32 {
                self as u32
            }

            pub const fn to_zero_based(self) -> u32 {
                self.raw() - Self::FIRST
            }

            pub const fn from_zero_based(value: u32) -> Option<Self> {
                match Self::FIRST.checked_add(value) {
                    Some(raw) => Self::from_raw(raw),
                    None => None,
                }
            }
        }
    };
}

cl_enum! {
    /// Kind of a memory object (`cl_mem_object_type`).
    pub enum MemObjectType {
        Buffer = 0x10F0,
        Image2D = 0x10F1,
        Image3D = 0x10F2,
        Image2DArray = 0x10F3,
        Image1D = 0x10F4,
        Image1DArray = 0x10F5,
        Image1DBuffer = 0x10F6,
    }
}

cl_enum! {
    /// Sampler addressing mode (`cl_addressing_mode`).
    pub enum AddressingMode {
        None = 0x1130,
        ClampToEdge = 0x1131,
        Clamp = 0x1132,
        Repeat = 0x1133,
        MirroredRepeat = 0x1134,
    }
}

cl_enum! {
    /// Sampler filter mode (`cl_filter_mode`).
    pub enum FilterMode {
        Nearest = 0x1140,
        Linear = 0x1141,
    }
}

cl_enum! {
    /// Image channel order (`cl_channel_order`).
    pub enum ChannelOrder {
        R = 0x10B0,
        A = 0x10B1,
        Rg = 0x10B2,
        Ra = 0x10B3,
        Rgb = 0x10B4,
        Rgba = 0x10B5,
        Bgra = 0x10B6,
        Argb = 0x10B7,
        Intensity = 0x10B8,
        Luminance = 0x10B9,
        Rx = 0x10BA,
        Rgx = 0x10BB,
        Rgbx = 0x10BC,
        Depth = 0x10BD,
        DepthStencil = 0x10BE,
        Srgb = 0x10BF,
        Srgbx = 0x10C0,
        Srgba = 0x10C1,
        Sbgra = 0x10C2,
        Abgr = 0x10C3,
    }
}

cl_enum! {
    /// Image channel data type (`cl_channel_type`).
    pub enum ChannelType {
        SnormInt8 = 0x10D0,
        SnormInt16 = 0x10D1,
        UnormInt8 = 0x10D2,
        UnormInt16 = 0x10D3,
        UnormShort565 = 0x10D4,
        UnormShort555 = 0x10D5,
        UnormInt101010 = 0x10D6,
        SignedInt8 = 0x10D7,
        SignedInt16 = 0x10D8,
        SignedInt32 = 0x10D9,
        UnsignedInt8 = 0x10DA,
        UnsignedInt16 = 0x10DB,
        UnsignedInt32 = 0x10DC,
        HalfFloat = 0x10DD,
        Float = 0x10DE,
        UnormInt24 = 0x10DF,
        UnormInt101010_2 = 0x10E0,
    }
}

/// GPU view dimension recorded in the UAV/SRV declaration tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceDimension {
    #[default]
    Unknown,
    Buffer,
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture3D,
}

/// Type name the compiler reports for sampler arguments.
pub const SAMPLER_TYPE_NAME: &str = "sampler_t";

/// Kernel-language image type names and the memory object kind / view dimension they bind to.
///
/// `image1d_buffer_t` is viewed as a buffer on the GPU even though it is an image to the API.
const IMAGE_TYPES: &[(&str, MemObjectType, ResourceDimension)] = &[
    ("image1d_buffer_t", MemObjectType::Image1DBuffer, ResourceDimension::Buffer),
    ("image1d_t", MemObjectType::Image1D, ResourceDimension::Texture1D),
    ("image1d_array_t", MemObjectType::Image1DArray, ResourceDimension::Texture1DArray),
    ("image2d_t", MemObjectType::Image2D, ResourceDimension::Texture2D),
    ("image2d_array_t", MemObjectType::Image2DArray, ResourceDimension::Texture2DArray),
    ("image3d_t", MemObjectType::Image3D, ResourceDimension::Texture3D),
];

/// Image kind for an argument type name, or `None` for anything that is not an image type.
///
/// Matching is exact: qualified spellings such as `read_only image2d_t` are not image names.
pub fn image_type_from_name(type_name: &str) -> Option<MemObjectType> {
    IMAGE_TYPES
        .iter()
        .find(|(name, _, _)| *name == type_name)
        .map(|(_, ty, _)| *ty)
}

/// View dimension used when an image of kind `ty` is bound to a kernel.
pub fn resource_dimension(ty: MemObjectType) -> ResourceDimension {
    IMAGE_TYPES
        .iter()
        .find(|(_, t, _)| *t == ty)
        .map(|(_, _, dim)| *dim)
        .unwrap_or(ResourceDimension::Unknown)
}

/// Type name for an image kind; the inverse of [`image_type_from_name`].
pub fn image_type_name(ty: MemObjectType) -> Option<&'static str> {
    IMAGE_TYPES
        .iter()
        .find(|(_, t, _)| *t == ty)
        .map(|(name, _, _)| *name)
}
