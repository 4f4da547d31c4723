use anyhow::Result;

use pagebrief_core::{
    page::{extract_text, truncate_text},
    AppConfig, HistoryStore, NewHistoryRecord, PageFetcher, Summarizer,
};

fn record_failure(history: &HistoryStore, url: &str, error: String) -> Result<()> {
    history.add(NewHistoryRecord {
        url: url.to_string(),
        summary: None,
        error: Some(error),
        char_count: 0,
    })?;
    Ok(())
}

pub async fn run(config: &AppConfig, history: &HistoryStore, url: &str) -> Result<()> {
    let fetcher = PageFetcher::new(config)?;
    let summarizer = Summarizer::new(config)?;
    tracing::debug!(
        "Primary model {}, fallback model {}",
        config.openai.model,
        config.ollama.model
    );

    println!("Fetching {}...", url);
    let html = match fetcher.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            record_failure(history, url, e.to_string())?;
            return Err(e.into());
        }
    };

    let text = extract_text(&html);
    let text = truncate_text(&text, config.fetch.max_text_length);
    if text.trim().is_empty() {
        let message = format!("No readable text found at {}", url);
        record_failure(history, url, message.clone())?;
        anyhow::bail!(message);
    }

    let char_count = text.chars().count();
    println!("Extracted {} characters, requesting summary...", char_count);

    match summarizer.summarize(text).await {
        Ok(summary) => {
            let record = history.add(NewHistoryRecord {
                url: url.to_string(),
                summary: Some(summary.clone()),
                error: None,
                char_count,
            })?;

            println!("\n{}\n", summary);
            println!("Saved as history record {}.", record.id);
            Ok(())
        }
        Err(e) => {
            record_failure(history, url, e.to_string())?;
            Err(e.into())
        }
    }
}
