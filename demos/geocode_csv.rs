//! Geocode an address CSV and print the resulting tour.
//!
//! Run with: GOOGLE_MAPS_API_KEY=... cargo run --example geocode_csv --features http -- sheet.csv

use std::fs::File;

use track_planner::{
    order_addresses, parse_address_rows, resolve_outcomes, Geocoder, GeocoderConfig, ImportConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).ok_or("usage: geocode_csv <sheet.csv>")?;
    let config = GeocoderConfig::from_env().ok_or("GOOGLE_MAPS_API_KEY is not set")?;

    let rows = parse_address_rows(File::open(&path)?, &ImportConfig::default())?;
    println!("Geocoding {} rows from {}", rows.len(), path);

    let fallback = config.fallback;
    let geocoder = Geocoder::new(config)?;
    let outcomes = geocoder.geocode_rows(rows).await;

    for failed in outcomes.iter().filter(|o| !o.success()) {
        println!(
            "  line {}: {} ({})",
            failed.row.line,
            failed.row.address_label,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    let tour = order_addresses(&resolve_outcomes(outcomes, fallback))?;
    for stop in &tour {
        println!(
            "{:>3}. {} ({:.5}, {:.5})",
            stop.visit_order,
            stop.address.address_label,
            stop.address.latitude,
            stop.address.longitude
        );
    }

    Ok(())
}
