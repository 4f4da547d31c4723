use anyhow::Result;

use pagebrief_core::{HistoryRecord, HistoryStore};

fn print_record(record: &HistoryRecord) {
    let status = if record.success { "ok" } else { "FAILED" };

    println!("  [{}] {} - {}", record.id, record.url, status);
    println!("    At: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

    if let Some(summary) = &record.summary {
        println!("    Summary: {}", summary);
    }
    if let Some(error) = &record.error {
        println!("    Error: {}", error);
    }
    println!();
}

pub fn list(history: &HistoryStore, limit: Option<usize>, json: bool) -> Result<()> {
    let records = history.list(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No requests recorded yet.");
        println!("\nTo summarize a page, run:");
        println!("  pagebrief summarize <url>");
        return Ok(());
    }

    println!("Past requests ({}):\n", records.len());
    for record in &records {
        print_record(record);
    }

    Ok(())
}

pub fn show(history: &HistoryStore, id: u64) -> Result<()> {
    let record = history.get(id)?;

    println!("Record {}", record.id);
    println!("  URL: {}", record.url);
    println!("  At: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Status: {}", if record.success { "ok" } else { "failed" });
    println!("  Input length: {} characters", record.char_count);

    if let Some(summary) = &record.summary {
        println!("  Summary ({} sentences):\n", record.sentence_count);
        println!("{}", summary);
    }
    if let Some(error) = &record.error {
        println!("  Error: {}", error);
    }

    Ok(())
}

pub fn delete(history: &HistoryStore, id: u64) -> Result<()> {
    history.delete(id)?;
    println!("Deleted record {}.", id);
    Ok(())
}

pub fn clear(history: &HistoryStore) -> Result<()> {
    history.clear()?;
    println!("History cleared.");
    Ok(())
}
