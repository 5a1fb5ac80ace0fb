use serde_json::Value;

use crate::domain::cpi::context::CpiContext;
use crate::domain::utils::id::StemcellCid;
use crate::error::Result;

/// Uploads the stemcell image at `image_path`; the CID is the name the fleet manager stored it under.
pub async fn create_stemcell(ctx: &CpiContext, image_path: &str, cloud_properties: &Value) -> Result<StemcellCid> {
    let image = tokio::fs::read(image_path).await?;
    log::info!("Uploading stemcell image '{}' ({} bytes, cloud properties: {}).", image_path, image.len(), cloud_properties);

    let name = format!("stemcell-{}", ctx.request_id());
    let uuid = ctx.api().upload_file(&name, image).await?;

    Ok(StemcellCid::new(uuid))
}

pub async fn delete_stemcell(ctx: &CpiContext, stemcell_cid: &StemcellCid) -> Result<()> {
    ctx.api().delete_file(stemcell_cid.as_str()).await?;

    log::info!("Deleted stemcell {}.", stemcell_cid);
    Ok(())
}
