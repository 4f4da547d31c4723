use anyhow::Result;

use pagebrief_core::HistoryStore;

pub fn run(history: &HistoryStore, json: bool) -> Result<()> {
    let stats = history.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.total == 0 {
        println!("No requests recorded yet.");
        return Ok(());
    }

    println!("Request statistics:\n");
    println!("  Total requests: {}", stats.total);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);

    if stats.succeeded > 0 {
        println!("  Total input processed: {} characters", stats.total_char_count);
        println!("  Average input length: {:.0} characters", stats.avg_char_count);
        println!("  Average summary length: {:.1} sentences", stats.avg_sentence_count);
    }

    Ok(())
}
