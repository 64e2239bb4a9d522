//! Resource declarations for a compiled kernel: how many constant buffers and samplers it binds,
//! and which view dimension each UAV (`u#`) and SRV (`t#`) slot is declared with.

use crate::cl_enums::{resource_dimension, ResourceDimension};
use crate::error::{KernelError, Result};
use crate::metadata::{AddressSpace, ArgProperties, KernelMetadata};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderDecls {
    pub num_cbs: u32,
    pub num_samplers: u32,
    /// Declared dimension of each writable (`u#`) slot.
    pub uav_decls: Vec<ResourceDimension>,
    /// Declared dimension of each read-only (`t#`) slot.
    pub srv_decls: Vec<ResourceDimension>,
}

impl ShaderDecls {
    pub fn from_metadata(metadata: &KernelMetadata) -> Result<Self> {
        let num_cbs = metadata
            .kernel_inputs_cbv_id
            .max(metadata.work_properties_cbv_id)
            .checked_add(1)
            .ok_or_else(|| {
                KernelError::MalformedMetadata("constant buffer index overflow".into())
            })?;

        let mut decls = ShaderDecls {
            num_cbs,
            num_samplers: metadata.num_samplers,
            uav_decls: vec![ResourceDimension::Unknown; metadata.num_uavs as usize],
            srv_decls: vec![ResourceDimension::Unknown; metadata.num_srvs as usize],
        };

        for (index, arg) in metadata.args.iter().enumerate() {
            if !matches!(
                arg.info.address_space,
                AddressSpace::Global | AddressSpace::Constant
            ) {
                continue;
            }

            match (arg.info.image_type(), &arg.properties) {
                (Some(image_type), ArgProperties::Image { buffer_ids, .. }) => {
                    let dim = resource_dimension(image_type);
                    let (table, kind) = if arg.info.is_writable() {
                        (&mut decls.uav_decls, "UAV")
                    } else {
                        (&mut decls.srv_decls, "SRV")
                    };
                    for &id in buffer_ids {
                        *declared_slot(table, id, index, kind)? = dim;
                    }
                }
                // Buffers always bind as UAVs; `const` is a language qualifier, not a view kind.
                (None, ArgProperties::Memory { buffer_id, .. }) => {
                    *declared_slot(&mut decls.uav_decls, *buffer_id, index, "UAV")? =
                        ResourceDimension::Buffer;
                }
                (_, props) => {
                    return Err(KernelError::MalformedMetadata(format!(
                        "argument {index} (`{}`) has {:?} properties",
                        arg.info.type_name,
                        props.kind()
                    )));
                }
            }
        }

        Ok(decls)
    }
}

fn declared_slot<'a>(
    table: &'a mut [ResourceDimension],
    id: u32,
    arg_index: usize,
    kind: &str,
) -> Result<&'a mut ResourceDimension> {
    let len = table.len();
    table.get_mut(id as usize).ok_or_else(|| {
        KernelError::MalformedMetadata(format!(
            "argument {arg_index} uses {kind} slot {id} but only {len} are declared"
        ))
    })
}
