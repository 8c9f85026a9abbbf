use crate::cli::AppContext;
use crate::core::summaries::{self, FileOutcome, RunReport};

pub async fn process_calls(ctx: &AppContext) -> anyhow::Result<()> {
    let service = ctx.call_summaries().await?;
    let report = service.process_new_call_files().await?;
    print_report(&report);
    Ok(())
}

pub async fn reset_watermark(ctx: &AppContext) -> anyhow::Result<()> {
    let properties = ctx.properties().await?;
    let existed = summaries::reset_watermark(&properties).await?;

    if existed {
        println!("Last processed timestamp has been reset. The next run will evaluate every call file.");
    } else {
        println!("No last processed timestamp was stored. The next run will evaluate every call file.");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.evaluated == 0 {
        println!("No new files to process.");
        return;
    }

    println!("Found {} new file(s) to evaluate.", report.evaluated);
    for (file, outcome) in &report.handled {
        match outcome {
            FileOutcome::Created {
                title, customer, ..
            } => println!("  {file}: created \"{title}\" in {customer}"),
            FileOutcome::TooShort => println!("  {file}: skipped, transcript too short"),
            FileOutcome::Duplicate { title } => {
                println!("  {file}: skipped, \"{title}\" already exists")
            }
        }
    }
    for (file, error) in &report.failed {
        println!("  {file}: failed, {error}");
    }

    match report.new_watermark {
        Some(ts) => println!(
            "Finished processing. {} summary document(s) created; last processed timestamp is now {}.",
            report.created(),
            ts.to_rfc3339()
        ),
        None => println!(
            "Finished processing. {} summary document(s) created; last processed timestamp unchanged.",
            report.created()
        ),
    }
}
