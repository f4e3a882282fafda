//! Import an address sheet, order it into a tour and frame it on a map.
//!
//! Run with: cargo run --example route_addresses

use track_planner::{
    compute_region, order_addresses, parse_address_rows, spread_markers, tour_length, GeoPoint,
    ImportConfig, RegionConfig, SpreadConfig,
};

const SHEET: &str = "\
ID,IRIS,SECTEUR,RUE,NUM,NB_LOGEMENTS,ADRESSE
1,A1,N,Rue de Rivoli,12,8,12 Rue de Rivoli 75001 Paris
2,A1,N,Rue Oberkampf,40,3,40 Rue Oberkampf 75011 Paris
3,A2,S,Quai Voltaire,5,2,5 Quai Voltaire 75007 Paris
4,A2,S,Quai Voltaire,5,6,5 bis Quai Voltaire 75007 Paris
5,A3,E,Rue de la Roquette,70,11,70 Rue de la Roquette 75011 Paris
";

// Coordinates a geocoder would return for the rows above
const COORDS: [(f64, f64); 5] = [
    (48.8556, 2.3601),
    (48.8655, 2.3745),
    (48.8583, 2.3310),
    (48.8583, 2.3310),
    (48.8553, 2.3752),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rows = parse_address_rows(SHEET.as_bytes(), &ImportConfig::default())?;
    let addresses: Vec<_> = rows
        .iter()
        .zip(COORDS)
        .map(|(row, (lat, lng))| row.resolve(GeoPoint::new(lat, lng)))
        .collect();

    println!("Imported {} addresses\n", addresses.len());

    let tour = order_addresses(&addresses)?;
    println!("Suggested visiting order:");
    for stop in &tour {
        println!(
            "  {}. {} ({} units)",
            stop.visit_order, stop.address.address_label, stop.address.unit_count
        );
    }
    println!("\nTour length: {:.0}m", tour_length(&tour)?);

    let pins = spread_markers(&tour, &SpreadConfig::default())?;
    let region = compute_region(&pins, &RegionConfig::default())?;
    println!(
        "Map region: center ({:.4}, {:.4}), span {:.3} x {:.3}",
        region.center_latitude, region.center_longitude, region.latitude_span, region.longitude_span
    );

    Ok(())
}
