use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use poi_locality::config::LocalityConfig;
use poi_locality::locality::InMemoryMapData;
use poi_locality::models::LocalityClassifier;
use poi_locality::{GeoPoint, LocalityFinder};

/// Parse a `lat,lon` query line
fn parse_query(line: &str) -> Option<GeoPoint> {
    let (lat, lon) = line.split_once(',')?;
    let point = GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    point.is_valid().then_some(point)
}

pub fn run(localities: &Path, queries: Option<&Path>, config: &LocalityConfig) -> Result<()> {
    let data = InMemoryMapData::from_path(localities)
        .with_context(|| format!("Failed to load localities from {}", localities.display()))?;
    info!("Loaded {} world features", data.feature_count());

    let mut finder = LocalityFinder::from_config(data, LocalityClassifier::default(), config);

    let input: Box<dyn BufRead> = match queries {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let mut resolved = 0usize;
    let mut total = 0usize;
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let Some(point) = parse_query(query) else {
            warn!("Skipping invalid query on line {}: {:?}", idx + 1, query);
            continue;
        };

        total += 1;
        let name = finder.get_locality_create_cache(point);
        if name.is_some() {
            resolved += 1;
        }
        writeln!(out, "{}\t{}", query, name.unwrap_or_default())?;
    }
    out.flush()?;

    info!(
        "Resolved {} of {} points with {} cache rebuilds",
        resolved,
        total,
        finder.rebuild_count()
    );
    Ok(())
}
