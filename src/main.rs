use anyhow::Context;
use clap::Command;
use geo::Point;
use itertools::Itertools;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{error, trace};

fn main() {
    tracing_subscriber::fmt().with_env_filter("trace").init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

const OUTPUT_FILENAME: &str = "node_locations.dat";

fn run() -> anyhow::Result<()> {
    parse_cmdline();

    println!("Ad Hoc Network Node Location Calculation");

    let stdin = io::stdin();
    let mut input = TokenReader::new(stdin.lock());

    let origin = read_initial_location(&mut input)?;
    let count = read_node_count(&mut input)?;
    let nodes = collect_nodes(&mut input, origin, count)?;
    report_node_spacing(&nodes);

    write_locations_file(Path::new(OUTPUT_FILENAME), origin, &nodes)
        .with_context(|| format!("failed to write '{OUTPUT_FILENAME}'"))?;
    println!(
        "Node locations have been written to '{OUTPUT_FILENAME}'. \
         Use a plotting tool (e.g., gnuplot) to visualize them."
    );

    Ok(())
}

fn parse_cmdline() {
    Command::new("calc_node_locations")
        .author("Russ Goetz, russgoetz@gmail.com")
        .version("1.0.0")
        .about(
            "Computes the locations of ad hoc network nodes placed at a given distance and \
             bearing from an initial node, and writes them to a file for plotting.",
        )
        .get_matches();
}

#[derive(Debug, Error)]
enum InputError {
    #[error("reached the end of input while expecting a number")]
    Exhausted,
    #[error("invalid numeric value '{0}'")]
    InvalidNumber(String),
    #[error("failed to read from input")]
    Io(#[from] io::Error),
}

/// Hands out whitespace-delimited tokens from a line-oriented source, reading
/// further lines as earlier ones run dry. One line may satisfy several
/// prompts.
struct TokenReader<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> Result<String, InputError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(InputError::Exhausted);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    fn next_f64(&mut self) -> Result<f64, InputError> {
        let token = self.next_token()?;
        token.parse().map_err(|_| InputError::InvalidNumber(token))
    }

    fn next_count(&mut self) -> Result<usize, InputError> {
        let token = self.next_token()?;
        token.parse().map_err(|_| InputError::InvalidNumber(token))
    }
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}

fn read_initial_location<R: BufRead>(input: &mut TokenReader<R>) -> anyhow::Result<Point> {
    prompt("Enter the initial latitude of the node (in degrees):")?;
    let lat = input
        .next_f64()
        .context("failed to read the initial latitude")?;
    prompt("Enter the initial longitude of the node (in degrees):")?;
    let lon = input
        .next_f64()
        .context("failed to read the initial longitude")?;

    let origin = Point::new(lon, lat);
    trace!("initial node at ({}, {})", origin.y(), origin.x());

    Ok(origin)
}

fn read_node_count<R: BufRead>(input: &mut TokenReader<R>) -> anyhow::Result<usize> {
    prompt("Enter the number of nearby nodes:")?;
    let count = input
        .next_count()
        .context("failed to read the number of nearby nodes")?;
    trace!("{count} nearby nodes");

    Ok(count)
}

fn collect_nodes<R: BufRead>(
    input: &mut TokenReader<R>,
    origin: Point,
    count: usize,
) -> anyhow::Result<Vec<Point>> {
    let mut nodes = Vec::new();
    for num in 1..=count {
        println!("\nNode {num}:");
        prompt("Enter the distance from this node (in kilometers): ")?;
        let distance = input
            .next_f64()
            .with_context(|| format!("node {num}: failed to read the distance"))?;
        prompt("Enter the bearing (direction) from the node in degrees (0-360): ")?;
        let bearing = input
            .next_f64()
            .with_context(|| format!("node {num}: failed to read the bearing"))?;

        // Every node is offset from the initial node, not from the previous one.
        let node = project_node(origin, distance, bearing);
        println!("Node {num} location (Lat, Lon): {}, {}", node.y(), node.x());
        trace!(
            "node {num}: requested {distance} km, haversine back to the initial node = {} km",
            haversine_distance(origin, node)
        );
        nodes.push(node);
    }

    Ok(nodes)
}

fn report_node_spacing(nodes: &[Point]) {
    for (idx, (a, b)) in nodes.iter().tuple_windows().enumerate() {
        trace!(
            "spacing between node {} and node {}: {} km",
            idx + 1,
            idx + 2,
            haversine_distance(*a, *b)
        );
    }
}

/// Mean Earth radius in kilometers, shared by both spherical formulas.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two points, by the haversine
/// formula. Points carry longitude in `x` and latitude in `y`, in degrees.
fn haversine_distance(from: Point, to: Point) -> f64 {
    let phi1 = from.y().to_radians();
    let phi2 = to.y().to_radians();
    let delta_phi = (to.y() - from.y()).to_radians();
    let delta_lambda = (to.x() - from.x()).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Projects a point `distance_km` out from `origin` along `bearing_deg`,
/// measured in degrees clockwise from due north. The result is left exactly
/// where the spherical model puts it: a projection past a pole or across the
/// antimeridian is not wrapped back into the usual coordinate ranges.
fn project_node(origin: Point, distance_km: f64, bearing_deg: f64) -> Point {
    let bearing = bearing_deg.to_radians();
    let lat = origin.y().to_radians();
    let lon = origin.x().to_radians();
    let delta = distance_km / EARTH_RADIUS_KM;

    let new_lat = (lat.sin() * delta.cos() + lat.cos() * delta.sin() * bearing.cos()).asin();
    let new_lon = lon
        + (bearing.sin() * delta.sin() * lat.cos())
            .atan2(delta.cos() - lat.sin() * new_lat.sin());

    Point::new(new_lon.to_degrees(), new_lat.to_degrees())
}

fn write_locations_file(path: &Path, origin: Point, nodes: &[Point]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{} {}", origin.y(), origin.x())?;
    for node in nodes {
        writeln!(writer, "{} {}", node.y(), node.x())?;
    }
    writer.flush()?;

    Ok(())
}
