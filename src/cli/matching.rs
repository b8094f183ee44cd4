use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use poi_locality::config::MatchingConfig;
use poi_locality::sponsored::{AddressIndex, ReverseGeocoder, SponsoredDataset, SponsoredObject};
use poi_locality::MapFeature;

pub struct MatchPaths {
    pub dataset: PathBuf,
    pub features: PathBuf,
    pub addresses: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

fn read_features(path: &Path) -> Result<Vec<MapFeature>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut features = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let feature: MapFeature = serde_json::from_str(&line)
            .with_context(|| format!("Invalid feature on line {}", idx + 1))?;
        features.push(feature);
    }
    Ok(features)
}

pub fn run<O: SponsoredObject>(paths: &MatchPaths, config: &MatchingConfig) -> Result<()> {
    let addresses = match &paths.addresses {
        Some(path) => {
            let index = AddressIndex::from_path(path)
                .context("Failed to load address reference")?
                .with_radius(config.address_lookup_radius_meters);
            info!("Loaded {} reference addresses", index.len());
            Some(index)
        }
        None => None,
    };
    let geocoder = addresses.as_ref().map(|a| a as &dyn ReverseGeocoder);

    let dataset: SponsoredDataset<O> = SponsoredDataset::from_path(&paths.dataset, geocoder, config.clone())
        .context("Failed to load sponsored dataset")?;

    let features = read_features(&paths.features)?;
    info!("Read {} map features", features.len());

    let pb = ProgressBar::new(features.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut out: Box<dyn Write> = match &paths.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut write_result: Result<()> = Ok(());
    let stats = dataset.match_features(features.into_iter().inspect(|_| pb.inc(1)), |feature| {
        if write_result.is_ok() {
            write_result = write_feature(&mut out, &feature);
        }
    });
    pb.finish_with_message("Matching complete");
    write_result?;
    out.flush()?;

    info!(
        "Done: {} features, {} matched, {} synthesized",
        stats.features, stats.matched, stats.synthesized
    );
    Ok(())
}

fn write_feature(out: &mut dyn Write, feature: &MapFeature) -> Result<()> {
    serde_json::to_writer(&mut *out, feature)?;
    out.write_all(b"\n")?;
    Ok(())
}
