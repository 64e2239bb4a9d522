use thiserror::Error;

pub type Result<T> = std::result::Result<T, KernelError>;

/// Numeric status codes reported by the API surface for [`KernelError`] variants.
pub mod status {
    pub const OUT_OF_RESOURCES: i32 = -5;
    pub const INVALID_DEVICE: i32 = -33;
    pub const INVALID_OPERATION: i32 = -59;
    pub const INVALID_PROGRAM_EXECUTABLE: i32 = -45;
    pub const INVALID_KERNEL_NAME: i32 = -46;
    pub const INVALID_KERNEL_DEFINITION: i32 = -47;
    pub const INVALID_ARG_INDEX: i32 = -49;
    pub const INVALID_ARG_VALUE: i32 = -50;
    pub const INVALID_ARG_SIZE: i32 = -51;
}

/// Failure creating a memory object or sampler in a [`crate::Context`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("invalid buffer size {size}")]
    InvalidBufferSize { size: usize },

    #[error("allocation of {size} bytes exceeds the maximum of {max} bytes")]
    AllocationTooLarge { size: usize, max: u64 },

    #[error("initial contents hold {provided} bytes but the object needs {size}")]
    HostDataTooSmall { size: usize, provided: usize },

    #[error("COPY_HOST_PTR requires initial contents")]
    MissingHostData,

    #[error("invalid memory flags: {0}")]
    InvalidFlags(&'static str),
}

/// Errors surfaced by kernel resolution, construction and argument binding.
///
/// Binding errors never leave partial state behind; construction and resolution errors never
/// produce a kernel object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("argument index {index} out of bounds (kernel has {count} arguments)")]
    InvalidArgIndex { index: u32, count: usize },

    #[error("invalid size {size} for argument {index}: {reason}")]
    InvalidArgSize {
        index: u32,
        size: usize,
        reason: &'static str,
    },

    #[error("invalid value for argument {index}: {reason}")]
    InvalidArgValue { index: u32, reason: &'static str },

    #[error("no executable available for program")]
    InvalidProgramExecutable,

    #[error("no kernel named `{0}` found")]
    InvalidKernelName(String),

    #[error("kernel `{name}` differs between devices: {reason}")]
    InvalidKernelDefinition { name: String, reason: &'static str },

    #[error("kernel `{0}` failed to compile")]
    KernelNotCompiled(String),

    #[error("malformed kernel metadata: {0}")]
    MalformedMetadata(String),

    #[error("device {0} is not associated with the program")]
    UnknownDevice(u32),

    #[error("program still has {0} live kernels attached")]
    KernelsAttached(u32),

    #[error("failed to create kernel resource: {0}")]
    OutOfResources(#[from] ResourceError),
}

impl KernelError {
    /// API status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArgIndex { .. } => status::INVALID_ARG_INDEX,
            Self::InvalidArgSize { .. } => status::INVALID_ARG_SIZE,
            Self::InvalidArgValue { .. } => status::INVALID_ARG_VALUE,
            Self::InvalidProgramExecutable => status::INVALID_PROGRAM_EXECUTABLE,
            Self::InvalidKernelName(_) => status::INVALID_KERNEL_NAME,
            Self::InvalidKernelDefinition { .. } => status::INVALID_KERNEL_DEFINITION,
            Self::UnknownDevice(_) => status::INVALID_DEVICE,
            Self::KernelsAttached(_) => status::INVALID_OPERATION,
            Self::KernelNotCompiled(_) | Self::MalformedMetadata(_) | Self::OutOfResources(_) => {
                status::OUT_OF_RESOURCES
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_report_out_of_resources() {
        let err = KernelError::from(ResourceError::InvalidBufferSize { size: 0 });
        assert_eq!(err.code(), status::OUT_OF_RESOURCES);
        assert_eq!(
            err.to_string(),
            "failed to create kernel resource: invalid buffer size 0"
        );
    }

    #[test]
    fn binding_errors_have_distinct_codes() {
        let codes = [
            KernelError::InvalidArgIndex { index: 3, count: 2 }.code(),
            KernelError::InvalidArgSize {
                index: 0,
                size: 1,
                reason: "",
            }
            .code(),
            KernelError::InvalidArgValue {
                index: 0,
                reason: "",
            }
            .code(),
        ];
        assert_eq!(
            codes,
            [
                status::INVALID_ARG_INDEX,
                status::INVALID_ARG_SIZE,
                status::INVALID_ARG_VALUE
            ]
        );
    }
}
