//! Address reconciliation pipeline.
//!
//! Loads a commune's reference addresses and OSM addresses, normalizes
//! street names, and writes duplicate/missing/excess reports.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use addr_reconcile::config::Config;
use addr_reconcile::matching::{diff_datasets, find_duplicates};
use addr_reconcile::models::{Address, Tags};
use addr_reconcile::normalize::{
    AltStreetNames, GithubFile, StreetNameMappings, StreetNameNormalizer, UpdateChecker,
    UpdateStatus,
};
use addr_reconcile::report::{
    addr_tags_distribution, format_distribution, format_ratio, osm_type_distribution,
    write_geojson, write_id_list,
};
use addr_reconcile::sources::emapa_csv::parse_emapa_csv_file;
use addr_reconcile::sources::emapa_download::{source_from_path, EmapaDownloader};
use addr_reconcile::sources::emapa_gml::parse_emapa_gml_file;
use addr_reconcile::sources::overpass::{
    load_query, render_query, street_tags, OverpassClient, ADDRESS_QUERY, STREET_QUERY,
};
use addr_reconcile::sources::pbf::read_pbf_file;
use addr_reconcile::sources::teryt::find_commune_name_in_file;

#[derive(Parser, Debug)]
#[command(name = "reconcile")]
#[command(about = "Compare reference address points with OSM addresses for a commune")]
struct Args {
    /// 7-character TERYT TERC commune id
    #[arg(short, long)]
    terc: String,

    /// Reference addresses (.csv, .csv.gz or .gml); downloaded from the
    /// GUGiK index into the data directory when omitted
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Value written to `source:addr` of reference addresses (defaults to
    /// the e-mapa system the file came from)
    #[arg(long)]
    source: Option<String>,

    /// TERYT TERC file used to print the commune name (optional)
    #[arg(long)]
    teryt_file: Option<PathBuf>,

    /// Read OSM addresses from a PBF extract instead of Overpass; addresses
    /// are clipped to the commune boundary found in the extract
    #[arg(long)]
    osm_pbf: Option<PathBuf>,

    /// Street names mappings table (defaults to <data_dir>/street_names_mappings.csv)
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// TOML configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compare housenumbers case-insensitively
    #[arg(long)]
    case_insensitive_housenumber: bool,

    /// Leave POIs without a building tag out of duplicate detection
    #[arg(long)]
    exclude_poi: bool,

    /// Skip checking the mappings table for updates
    #[arg(long)]
    no_update_check: bool,

    /// Download the mappings table when the local copy is outdated
    #[arg(long)]
    update_mappings: bool,

    /// Output base directory; reports go to <output>/<terc>/
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if self.case_insensitive_housenumber {
            config.matching.case_insensitive_housenumber = true;
        }
        if self.exclude_poi {
            config.matching.exclude_poi = true;
        }
        if self.no_update_check {
            config.update_check.enabled = false;
        }
        if let Some(output) = &self.output {
            config.paths.output_dir = output.clone();
        }
    }
}

/// OSM side of the comparison
struct MapDataset {
    addresses: Vec<Address>,
    streets: Vec<Tags>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    let match_config = config.matching;

    info!("Address reconciliation for TERC {}", args.terc);

    if let Some(teryt_file) = &args.teryt_file {
        let name = find_commune_name_in_file(teryt_file, &args.terc)
            .context("Failed to look up commune in TERYT file")?;
        info!("Commune: {}", name);
    }

    // Street names mappings
    let mappings_path = args
        .mappings
        .clone()
        .unwrap_or_else(|| config.paths.mappings_file());

    if config.update_check.enabled {
        let checker = UpdateChecker::new(GithubFile::from(&config.update_check))
            .context("Failed to build GitHub client")?;
        let status = checker.check(&mappings_path).await;
        let needs_download = matches!(status, UpdateStatus::Stale { .. }) || !mappings_path.exists();
        if args.update_mappings && needs_download {
            if let Err(e) = checker.download(&mappings_path).await {
                warn!("Failed to download street names mappings: {}", e);
            }
        }
    }

    let mappings = match StreetNameMappings::load_from_file(&mappings_path) {
        Ok(m) => m,
        Err(e) => {
            warn!(
                "Could not load street names mappings from {}: {}. Continuing without them.",
                mappings_path.display(),
                e
            );
            StreetNameMappings::new()
        }
    };

    // Reference dataset
    let (reference_path, source) = match &args.reference {
        Some(path) => {
            let source = args
                .source
                .clone()
                .or_else(|| source_from_path(path))
                .context("Cannot tell the reference source from the file name, pass --source")?;
            (path.clone(), source)
        }
        None => {
            let downloader =
                EmapaDownloader::new(&config.emapa).context("Failed to build e-mapa client")?;
            let download = downloader
                .download(&args.terc, &config.paths.data_dir)
                .await
                .context("Failed to download e-mapa addresses")?;
            let source = args.source.clone().unwrap_or(download.source);
            (download.path, source)
        }
    };
    let mut reference = load_reference(&reference_path, &source)?;

    // Map dataset
    let map = match &args.osm_pbf {
        Some(path) => {
            let dataset = read_pbf_file(path, Some(args.terc.as_str()))
                .context("Failed to read PBF file")?;
            MapDataset {
                addresses: dataset.addresses.records,
                streets: dataset.streets,
            }
        }
        None => fetch_overpass(&config, &args.terc).await?,
    };

    // Normalize reference street names
    let alt_names = AltStreetNames::from_street_tags(&map.streets);
    let summary = StreetNameNormalizer::new(&mappings)
        .with_alt_names(&alt_names)
        .normalize(&mut reference);
    info!("Street names changed on {} reference addresses", summary.replaced);

    print_stats(&map.addresses);

    // Compare
    let duplicates = find_duplicates(&map.addresses, &match_config);
    let diff = diff_datasets(&reference, &map.addresses, &match_config);

    info!("Reference addresses: {}", reference.len());
    info!("OSM addresses: {}", map.addresses.len());
    info!(
        "Duplicated OSM addresses: {}",
        format_ratio(duplicates.len(), map.addresses.len())
    );
    info!("Missing in OSM: {}", diff.missing.len());
    info!("Excess in OSM: {}", diff.excess.len());

    // Reports
    let out_dir = config.paths.output_dir.join(&args.terc);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    write_geojson(&out_dir.join("all_addresses.geojson"), &reference)
        .context("Failed to write all_addresses.geojson")?;
    write_geojson(&out_dir.join("missing.geojson"), diff.missing.iter().copied())
        .context("Failed to write missing.geojson")?;
    write_id_list(
        &out_dir.join("duplicates.txt"),
        duplicates.iter().flatten().copied(),
    )
    .context("Failed to write duplicates.txt")?;
    write_id_list(&out_dir.join("excess.txt"), diff.excess.iter().copied())
        .context("Failed to write excess.txt")?;

    info!("Reports written to {}", out_dir.display());
    Ok(())
}

fn load_reference(path: &Path, source: &str) -> Result<Vec<Address>> {
    let is_gml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gml") || e.eq_ignore_ascii_case("xml"));

    let batch = if is_gml {
        parse_emapa_gml_file(path, source)
    } else {
        parse_emapa_csv_file(path, source)
    }
    .with_context(|| format!("Failed to parse reference file {}", path.display()))?;

    Ok(batch.records)
}

async fn fetch_overpass(config: &Config, terc: &str) -> Result<MapDataset> {
    let overpass = &config.overpass;
    let client = OverpassClient::new(overpass).context("Failed to build Overpass client")?;

    let address_query = match &overpass.address_query_file {
        Some(path) => load_query(path, terc).context("Failed to load address query")?,
        None => render_query(ADDRESS_QUERY, terc),
    };
    let street_query = match &overpass.street_query_file {
        Some(path) => load_query(path, terc).context("Failed to load street query")?,
        None => render_query(STREET_QUERY, terc),
    };

    let addresses = client
        .fetch_addresses(&address_query)
        .await
        .context("Failed to download OSM addresses")?;
    let streets = client
        .fetch_streets(&street_query)
        .await
        .context("Failed to download OSM streets")?;

    Ok(MapDataset {
        addresses: addresses.records,
        streets: street_tags(&streets).cloned().collect(),
    })
}

fn print_stats(addresses: &[Address]) {
    let total = addresses.len();
    info!(
        "Address tags in OSM:\n{}",
        format_distribution(&addr_tags_distribution(addresses), total)
    );
    info!(
        "OSM object types:\n{}",
        format_distribution(&osm_type_distribution(addresses), total)
    );
}
