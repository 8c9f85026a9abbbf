use crate::cli::AppContext;

pub async fn sync_csv(ctx: &AppContext) -> anyhow::Result<()> {
    let service = ctx.csv_sync().await?;
    let results = service.refresh_all().await;

    for result in &results {
        println!("{}", result.describe());
    }

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} CSV import(s) failed", results.len());
    }
    Ok(())
}
