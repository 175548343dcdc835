//! Categorize command implementation

use std::path::Path;

use anyhow::Result;

use super::open_engine;

pub async fn cmd_categorize(
    config_path: Option<&Path>,
    descriptions: &[String],
    detailed: bool,
    json: bool,
) -> Result<()> {
    let engine = open_engine(config_path)?;

    if detailed {
        let mut results = Vec::with_capacity(descriptions.len());
        for description in descriptions {
            results.push((description, engine.categorize_detailed(description).await?));
        }
        engine.shutdown().await;

        if json {
            let value: Vec<_> = results
                .iter()
                .map(|(description, result)| {
                    serde_json::json!({ "description": description, "result": result })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        for (description, result) in &results {
            println!("{}", description);
            let marker = if result.fallback_applied {
                " (low confidence)"
            } else {
                ""
            };
            println!("   → {}{}", result.category, marker);
            let mut scores = result.scores.clone();
            scores.sort_by(|a, b| b.score.total_cmp(&a.score));
            for s in &scores {
                println!("     {:>6.1}%  {}", s.score * 100.0, s.label);
            }
        }
    } else {
        let categories = engine.batch_categorize(descriptions).await?;
        engine.shutdown().await;

        if json {
            let value: Vec<_> = descriptions
                .iter()
                .zip(&categories)
                .map(|(d, c)| serde_json::json!({ "description": d, "category": c }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        let width = descriptions.iter().map(|d| d.len()).max().unwrap_or(0).min(40);
        for (description, category) in descriptions.iter().zip(&categories) {
            println!("{:<width$}  {}", truncate(description, width), category, width = width);
        }
    }

    Ok(())
}

/// Truncate a string to a maximum number of characters
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
