//! Profile command implementation

use std::path::Path;

use anyhow::Result;
use mentor_core::SpendingVector;

use super::open_engine;

pub fn cmd_profile(config_path: Option<&Path>, amounts: &[f64], json: bool) -> Result<()> {
    let engine = open_engine(config_path)?;
    let model = engine.profile_model();

    let vector = SpendingVector::new(amounts.to_vec())?;
    let assignment = engine.classify_profile(&vector)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assignment)?);
        return Ok(());
    }

    println!("👤 {}", assignment.archetype);
    for (feature, amount) in model.features().iter().zip(vector.values()) {
        println!("   {:<16} {:>10.2}", feature, amount);
    }
    println!("   {:<16} {:>10.2}", "total", vector.total());
    println!();
    println!("Archetype centroids:");
    for (i, (label, centroid)) in model.labels().iter().zip(model.centroids()).enumerate() {
        let marker = if i == assignment.cluster { "→" } else { " " };
        let total: f64 = centroid.iter().sum();
        println!("   {} {:<24} total {:>10.2}", marker, label, total);
    }

    Ok(())
}
