use crate::cli::AppContext;
use crate::core::snapshots::SnapshotKind;

use super::SnapshotTarget;

pub async fn snapshot(ctx: &AppContext, target: SnapshotTarget) -> anyhow::Result<()> {
    let service = ctx.snapshots().await?;

    let kind = match target {
        SnapshotTarget::Sales => SnapshotKind::Sales,
        SnapshotTarget::Deals => SnapshotKind::Deals,
        SnapshotTarget::Pbf => SnapshotKind::Pbf,
        SnapshotTarget::All => {
            let bundle = service.snapshot_all().await?;
            println!(
                "Snapshots created: \"{}\", \"{}\", \"{}\"",
                bundle.sales, bundle.deals, bundle.pbf
            );
            return Ok(());
        }
    };

    let name = service.snapshot(kind).await?;
    println!("Snapshot created: \"{name}\"");
    Ok(())
}
