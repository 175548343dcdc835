//! Config command implementation

use std::path::Path;

use anyhow::Result;
use mentor_core::config::default_config_path;

use super::load_config;

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("⚙️  BudgetMentor configuration");
    println!("   Source: {}", config.source);
    if let Some(path) = default_config_path() {
        println!("   Override path: {}", path.display());
    }
    println!();

    println!("Backend:");
    println!("   Kind:        {}", config.backend.kind.as_str());
    println!("   Host:        {}", config.backend.host);
    println!("   Model:       {}", config.backend.model);
    println!("   Timeout:     {}s", config.backend.timeout.as_secs());
    println!("   Temperature: {}", config.backend.temperature);
    println!(
        "   API key:     {}",
        if config.backend.api_key.is_some() { "set" } else { "not set" }
    );
    println!();

    println!("Categorizer:");
    println!("   Categories:  {}", config.categorizer.categories.join(", "));
    println!("   Fallback:    {}", config.categorizer.fallback);
    println!("   Min margin:  {}", config.categorizer.min_margin);
    println!();

    println!("Profiler:");
    println!("   Features:    {}", config.profiler.features.join(", "));
    println!("   Archetypes:  {}", config.profiler.labels.join(", "));
    match &config.profiler.population_path {
        Some(path) => println!("   Population:  {}", path.display()),
        None => println!("   Population:  built-in reference"),
    }
    println!();

    println!("Forecast:");
    println!("   Trend window: {}", config.forecast.trend_window);
    println!("   Noise spread: {}", config.forecast.noise_spread);
    println!("   Horizon:      {}", config.forecast.horizon);
    println!("   Max horizon:  {}", config.forecast.max_horizon);
    println!(
        "   Sequence:     window {}, hidden {}, {} epochs",
        config.sequence.window, config.sequence.hidden_size, config.sequence.epochs
    );

    Ok(())
}
