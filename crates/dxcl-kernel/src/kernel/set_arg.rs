use std::sync::Arc;

use tracing::{debug, trace};

use super::{ArgConfig, Kernel, SamplerConfig};
use crate::cl_enums::MemObjectType;
use crate::error::{KernelError, Result};
use crate::memory::{ImageFormat, MemObject, Sampler};
use crate::metadata::ArgProperties;

/// Size of an opaque memory object or sampler handle, as passed to `set_arg`.
pub const HANDLE_SIZE: usize = std::mem::size_of::<usize>();

/// Encoded value of an unbound buffer argument.
const NULL_BUFFER: u64 = !0;

/// Value supplied for a kernel argument. `set_arg` receives `None` where the API passes a null
/// value pointer.
#[derive(Debug, Clone, Copy)]
pub enum ArgValue<'a> {
    Mem(Option<&'a Arc<MemObject>>),
    Sampler(Option<&'a Arc<Sampler>>),
    Bytes(&'a [u8]),
}

impl Kernel {
    /// Sets argument `index`, replacing whatever it was previously bound to.
    ///
    /// `size` follows API semantics: the handle size for memory objects and samplers, the
    /// compiled size for scalars, and the requested allocation for `__local` arguments. On error
    /// the kernel is left unchanged.
    pub fn set_arg(&mut self, index: u32, size: usize, value: Option<ArgValue<'_>>) -> Result<()> {
        let result = self.apply_arg(index, size, value);
        match &result {
            Ok(()) => trace!(kernel = %self.name(), index, size, "set kernel argument"),
            Err(err) => debug!(kernel = %self.name(), index, size, %err, "set_arg rejected"),
        }
        result
    }

    pub fn set_arg_mem(&mut self, index: u32, mem: Option<&Arc<MemObject>>) -> Result<()> {
        self.set_arg(index, HANDLE_SIZE, Some(ArgValue::Mem(mem)))
    }

    pub fn set_arg_sampler(&mut self, index: u32, sampler: Option<&Arc<Sampler>>) -> Result<()> {
        self.set_arg(index, HANDLE_SIZE, Some(ArgValue::Sampler(sampler)))
    }

    pub fn set_arg_bytes(&mut self, index: u32, bytes: &[u8]) -> Result<()> {
        self.set_arg(index, bytes.len(), Some(ArgValue::Bytes(bytes)))
    }

    pub fn set_arg_local(&mut self, index: u32, size: usize) -> Result<()> {
        self.set_arg(index, size, None)
    }

    fn apply_arg(&mut self, index: u32, size: usize, value: Option<ArgValue<'_>>) -> Result<()> {
        let metadata = self.metadata.clone();
        let arg = metadata
            .args
            .get(index as usize)
            .ok_or(KernelError::InvalidArgIndex {
                index,
                count: metadata.args.len(),
            })?;
        let info = &arg.info;

        let invalid_size = |reason| KernelError::InvalidArgSize {
            index,
            size,
            reason,
        };
        let invalid_value = |reason| KernelError::InvalidArgValue { index, reason };

        match &arg.properties {
            ArgProperties::Image { buffer_ids, offset } => {
                let mem = mem_value(size, value).map_err(|e| e.for_arg(index, size))?;
                // Checked by `classify` at construction.
                let Some(expected) = info.image_type() else {
                    return Err(invalid_value("argument is not an image"));
                };

                if let Some(mem) = mem {
                    if mem.kind() != expected {
                        return Err(invalid_value("invalid image type"));
                    }
                    if info.is_writable() {
                        if mem.is_read_only() {
                            return Err(invalid_value(
                                "binding read-only image to writable image argument",
                            ));
                        }
                        if info.is_readable() && mem.is_write_only() {
                            return Err(invalid_value(
                                "binding write-only image to read-write image argument",
                            ));
                        }
                    } else if mem.is_write_only() {
                        return Err(invalid_value(
                            "binding write-only image to read-only image argument",
                        ));
                    }
                }

                let slots = if info.is_writable() {
                    &mut self.uavs
                } else {
                    &mut self.srvs
                };
                for &id in buffer_ids {
                    slots[id as usize] = mem.map(Arc::downgrade);
                }

                let header = mem
                    .and_then(|m| m.format())
                    .map(|f| f.device_header())
                    .unwrap_or([0; ImageFormat::HEADER_SIZE]);
                write_cb(&mut self.cb_data, *offset, &header);
            }

            ArgProperties::Memory { buffer_id, offset } => {
                let mem = mem_value(size, value).map_err(|e| e.for_arg(index, size))?;
                if mem.is_some_and(|m| m.kind() != MemObjectType::Buffer) {
                    return Err(invalid_value("invalid mem object type, must be buffer"));
                }

                self.uavs[*buffer_id as usize] = mem.map(Arc::downgrade);
                let encoded = match mem {
                    Some(_) => u64::from(*buffer_id) << 32,
                    None => NULL_BUFFER,
                };
                write_cb(&mut self.cb_data, *offset, &encoded.to_le_bytes());
            }

            ArgProperties::Sampler { sampler_id } => {
                if size != HANDLE_SIZE {
                    return Err(invalid_size("sampler arguments take a sampler handle"));
                }
                let sampler = match value {
                    None | Some(ArgValue::Sampler(None)) => None,
                    Some(ArgValue::Sampler(Some(s))) => Some(s),
                    Some(_) => return Err(invalid_value("expected a sampler")),
                };

                self.samplers[*sampler_id as usize] = sampler.map(Arc::downgrade);
                self.arg_configs[index as usize] = ArgConfig::Sampler(Some(
                    sampler.map_or(SamplerConfig::UNBOUND, |s| SamplerConfig::from_desc(s.desc())),
                ));
            }

            ArgProperties::Scalar {
                offset,
                size: expected,
            } => {
                if size != *expected as usize {
                    return Err(invalid_size("size differs from the compiled argument size"));
                }
                let bytes = match value {
                    Some(ArgValue::Bytes(bytes)) => bytes,
                    None => return Err(invalid_value("scalar arguments require a value")),
                    Some(_) => return Err(invalid_value("expected argument bytes")),
                };
                if bytes.len() != size {
                    return Err(invalid_size("value length differs from size"));
                }
                write_cb(&mut self.cb_data, *offset, bytes);
            }

            ArgProperties::Local => {
                if size == 0 {
                    return Err(invalid_size("local arguments need a nonzero size"));
                }
                if value.is_some() {
                    return Err(invalid_value("value must be null for local arguments"));
                }
                let size =
                    u32::try_from(size).map_err(|_| invalid_size("local size exceeds 32 bits"))?;
                self.arg_configs[index as usize] = ArgConfig::Local { size };
            }
        }

        Ok(())
    }
}

/// Rejection reason for a memory-object value, before it is tied to an argument index.
enum MemValueError {
    Size,
    Value,
}

impl MemValueError {
    fn for_arg(self, index: u32, size: usize) -> KernelError {
        match self {
            Self::Size => KernelError::InvalidArgSize {
                index,
                size,
                reason: "global and constant arguments take a memory object handle",
            },
            Self::Value => KernelError::InvalidArgValue {
                index,
                reason: "expected a memory object",
            },
        }
    }
}

fn mem_value<'a>(
    size: usize,
    value: Option<ArgValue<'a>>,
) -> std::result::Result<Option<&'a Arc<MemObject>>, MemValueError> {
    if size != HANDLE_SIZE {
        return Err(MemValueError::Size);
    }
    match value {
        None => Ok(None),
        Some(ArgValue::Mem(mem)) => Ok(mem),
        Some(_) => Err(MemValueError::Value),
    }
}

/// Offsets are range-checked when the kernel is built.
fn write_cb(cb_data: &mut [u8], offset: u32, bytes: &[u8]) {
    let start = offset as usize;
    cb_data[start..start + bytes.len()].copy_from_slice(bytes);
}
