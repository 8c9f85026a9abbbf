use crate::cli::AppContext;
use crate::core::similarity::jaro_winkler_similarity;

pub fn similarity(a: &str, b: &str) {
    println!("{:.4}", jaro_winkler_similarity(a, b));
}

pub async fn suggest_merges(ctx: &AppContext, threshold: f64) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("threshold must be between 0 and 1, got {threshold}");
    }

    let folders = ctx.folders().await?;
    let suggestions = folders.find_merge_suggestions(threshold).await?;

    if suggestions.is_empty() {
        println!("No similar folders found.");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!("Potential duplicate found:");
        println!("  Folder A: \"{}\"", suggestion.keep.name);
        println!("  Folder B: \"{}\"", suggestion.merge.name);
        println!("  Similarity: {:.2}", suggestion.score);
        println!(
            "  To merge B into A run: sales-ops merge-folders \"{}\" \"{}\"",
            suggestion.merge.name, suggestion.keep.name
        );
        println!();
    }
    println!("{} potential duplicate(s) found.", suggestions.len());
    Ok(())
}

pub async fn merge_folders(
    ctx: &AppContext,
    source: &str,
    destination: &str,
) -> anyhow::Result<()> {
    let folders = ctx.folders().await?;
    let report = folders.merge_folders(source, destination).await?;

    println!(
        "SUCCESS: Merged {} file(s) from \"{}\" into \"{}\". Source folder deleted.",
        report.files_moved, report.source, report.destination
    );
    Ok(())
}
