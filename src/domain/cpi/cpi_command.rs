use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::cpi_request_dto::{CpiRequestDto, NetworksDto};
use crate::domain::cpi::context::CpiContext;
use crate::domain::cpi::disk_lifecycle;
use crate::domain::cpi::stemcell;
use crate::domain::cpi::vm_lifecycle::{self, CreateVmRequest};
use crate::domain::utils::id::{AgentId, DiskCid, StemcellCid, VmCid};
use crate::error::{Error, Result};

/// A decoded CPI call.
#[derive(Debug, Clone, PartialEq)]
pub enum CpiCommand {
    CreateStemcell { image_path: String, cloud_properties: Value },
    DeleteStemcell { stemcell_cid: StemcellCid },
    CreateVm(CreateVmRequest),
    DeleteVm { vm_cid: VmCid },
    HasVm { vm_cid: VmCid },
    SetVmMetadata { vm_cid: VmCid, metadata: Value },
    CreateDisk { size_mb: u64, cloud_properties: Value, vm_cid: Option<VmCid> },
    DeleteDisk { disk_cid: DiskCid },
    AttachDisk { vm_cid: VmCid, disk_cid: DiskCid },
    DetachDisk { vm_cid: VmCid, disk_cid: DiskCid },
    HasDisk { disk_cid: DiskCid },
    GetDisks { vm_cid: VmCid },
}

/// Positional arguments of one call.
struct Arguments<'a> {
    method: &'a str,
    values: &'a [Value],
}

impl Arguments<'_> {
    fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }

    fn invalid(&self, index: usize, expected: &str) -> Error {
        Error::ValidationError(format!("{}: argument {} must be {}, got {}", self.method, index, expected, self.get(index)))
    }

    fn string(&self, index: usize) -> Result<String> {
        self.get(index).as_str().map(str::to_string).ok_or_else(|| self.invalid(index, "a string"))
    }

    /// Null and "" both mean absent.
    fn optional_string(&self, index: usize) -> Result<Option<String>> {
        match self.get(index) {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.invalid(index, "a string or null")),
        }
    }

    fn size(&self, index: usize) -> Result<u64> {
        self.get(index).as_u64().ok_or_else(|| self.invalid(index, "a non-negative integer"))
    }

    fn value(&self, index: usize) -> Value {
        self.get(index).clone()
    }

    fn typed<T: DeserializeOwned + Default>(&self, index: usize) -> Result<T> {
        match self.get(index) {
            Value::Null => Ok(T::default()),
            value => serde_json::from_value(value.clone()).map_err(|e| Error::ValidationError(format!("{}: argument {} is malformed: {}", self.method, index, e))),
        }
    }
}

impl TryFrom<&CpiRequestDto> for CpiCommand {
    type Error = Error;

    fn try_from(request: &CpiRequestDto) -> Result<Self> {
        let args = Arguments { method: &request.method, values: &request.arguments };

        let command = match request.method.as_str() {
            "create_stemcell" => CpiCommand::CreateStemcell { image_path: args.string(0)?, cloud_properties: args.value(1) },
            "delete_stemcell" => CpiCommand::DeleteStemcell { stemcell_cid: StemcellCid::new(args.string(0)?) },
            "create_vm" => {
                let disk_cids: Vec<String> = args.typed(4)?;
                CpiCommand::CreateVm(CreateVmRequest {
                    agent_id: AgentId::new(args.string(0)?),
                    stemcell_cid: StemcellCid::new(args.string(1)?),
                    cloud_properties: args.value(2),
                    networks: args.typed::<NetworksDto>(3)?,
                    disk_cids: disk_cids.into_iter().filter(|cid| !cid.is_empty()).map(DiskCid::new).collect(),
                    env: args.value(5),
                })
            }
            "delete_vm" => CpiCommand::DeleteVm { vm_cid: VmCid::new(args.string(0)?) },
            "has_vm" => CpiCommand::HasVm { vm_cid: VmCid::new(args.string(0)?) },
            "set_vm_metadata" => CpiCommand::SetVmMetadata { vm_cid: VmCid::new(args.string(0)?), metadata: args.value(1) },
            "create_disk" => CpiCommand::CreateDisk { size_mb: args.size(0)?, cloud_properties: args.value(1), vm_cid: args.optional_string(2)?.map(VmCid::new) },
            "delete_disk" => CpiCommand::DeleteDisk { disk_cid: DiskCid::new(args.string(0)?) },
            "attach_disk" => CpiCommand::AttachDisk { vm_cid: VmCid::new(args.string(0)?), disk_cid: DiskCid::new(args.string(1)?) },
            "detach_disk" => CpiCommand::DetachDisk { vm_cid: VmCid::new(args.string(0)?), disk_cid: DiskCid::new(args.string(1)?) },
            "has_disk" => CpiCommand::HasDisk { disk_cid: DiskCid::new(args.string(0)?) },
            "get_disks" => CpiCommand::GetDisks { vm_cid: VmCid::new(args.string(0)?) },
            other => return Err(Error::NotImplemented(other.to_string())),
        };

        Ok(command)
    }
}

impl CpiCommand {
    pub fn method(&self) -> &'static str {
        match self {
            CpiCommand::CreateStemcell { .. } => "create_stemcell",
            CpiCommand::DeleteStemcell { .. } => "delete_stemcell",
            CpiCommand::CreateVm(_) => "create_vm",
            CpiCommand::DeleteVm { .. } => "delete_vm",
            CpiCommand::HasVm { .. } => "has_vm",
            CpiCommand::SetVmMetadata { .. } => "set_vm_metadata",
            CpiCommand::CreateDisk { .. } => "create_disk",
            CpiCommand::DeleteDisk { .. } => "delete_disk",
            CpiCommand::AttachDisk { .. } => "attach_disk",
            CpiCommand::DetachDisk { .. } => "detach_disk",
            CpiCommand::HasDisk { .. } => "has_disk",
            CpiCommand::GetDisks { .. } => "get_disks",
        }
    }

    /// Runs the command; the result is what goes into the `result` field of the response.
    pub async fn execute(&self, ctx: &CpiContext) -> Result<Value> {
        let result = match self {
            CpiCommand::CreateStemcell { image_path, cloud_properties } => json!(stemcell::create_stemcell(ctx, image_path, cloud_properties).await?),
            CpiCommand::DeleteStemcell { stemcell_cid } => {
                stemcell::delete_stemcell(ctx, stemcell_cid).await?;
                Value::Null
            }
            CpiCommand::CreateVm(request) => json!(vm_lifecycle::create_vm(ctx, request).await?),
            CpiCommand::DeleteVm { vm_cid } => {
                vm_lifecycle::delete_vm(ctx, vm_cid).await?;
                Value::Null
            }
            CpiCommand::HasVm { vm_cid } => json!(vm_lifecycle::has_vm(ctx, vm_cid).await?),
            CpiCommand::SetVmMetadata { vm_cid, metadata } => {
                vm_lifecycle::set_vm_metadata(ctx, vm_cid, metadata).await?;
                Value::Null
            }
            CpiCommand::CreateDisk { size_mb, cloud_properties, vm_cid } => {
                json!(disk_lifecycle::create_disk(ctx, *size_mb, cloud_properties, vm_cid.as_ref()).await?)
            }
            CpiCommand::DeleteDisk { disk_cid } => {
                disk_lifecycle::delete_disk(ctx, disk_cid).await?;
                Value::Null
            }
            CpiCommand::AttachDisk { vm_cid, disk_cid } => {
                disk_lifecycle::attach_disk(ctx, vm_cid, disk_cid).await?;
                Value::Null
            }
            CpiCommand::DetachDisk { vm_cid, disk_cid } => {
                disk_lifecycle::detach_disk(ctx, vm_cid, disk_cid).await?;
                Value::Null
            }
            CpiCommand::HasDisk { disk_cid } => json!(disk_lifecycle::has_disk(ctx, disk_cid).await?),
            CpiCommand::GetDisks { vm_cid } => json!(disk_lifecycle::get_disks(ctx, vm_cid).await?),
        };

        Ok(result)
    }
}

/// Decodes and runs one request. Errors carry the name of the failed method.
pub async fn handle_request(ctx: &CpiContext, request: &CpiRequestDto) -> Result<Value> {
    let command = CpiCommand::try_from(request)?;
    log::info!("Handling {} (request id {}).", command.method(), ctx.request_id());

    command.execute(ctx).await.map_err(|e| {
        log::error!("CpiCommandFailed: {} failed: {}", command.method(), e);
        Error::during(command.method(), e)
    })
}
