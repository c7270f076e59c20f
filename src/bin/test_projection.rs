use anyhow;
use geo::{algorithm::haversine_destination::HaversineDestination, Point};

fn main() -> anyhow::Result<()> {
    // One degree of latitude north of the equator, per the geo crate's
    // haversine destination. Compare against the main program's output for
    // an initial node at (0, 0) with one node at 111.19 km, bearing 0.
    let start = Point::new(0.0, 0.0);
    // Distance = 111.19 km @ 0 degrees, in meters for the geo crate.
    let dist = 111.19 * 1000.0;
    let bearing = 0.0;
    let dest = start.haversine_destination(bearing, dist);
    println!("Destination lat={}, lon={}", dest.y(), dest.x());

    Ok(())
}
