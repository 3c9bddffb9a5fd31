//! Reference CSV download from the GUGiK address data index.
//!
//! The index page lists every commune with links to its address exports
//! and the local map system publishing them. Only communes served by an
//! e-mapa system are supported; the system's host name becomes the
//! `source:addr` of the downloaded addresses.

use regex::Regex;
use reqwest::Client;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EmapaConfig;
use crate::error::{ReconcileError, Result};

static ROW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("valid row regex"));
static CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("valid cell regex"));
static HREF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']*)["']"#).expect("valid href regex")
});
static ANCHOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a[^>]*>(.*?)</a>").expect("valid anchor regex"));
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Index rows: number, TERYT, name, SHP, GML, CSV, local system
const COLUMN_COUNT: usize = 7;
const TERYT_COLUMN: usize = 1;
const CSV_COLUMN: usize = 5;
const LOCAL_SYSTEM_COLUMN: usize = 6;

/// Index row of a single commune
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmapaEntry {
    pub csv_url: String,
    /// Host of the local map system, e.g. `gminaxyz.e-mapa.net`
    pub local_system_url: String,
}

impl EmapaEntry {
    pub fn is_emapa(&self) -> bool {
        self.local_system_url.contains("e-mapa")
    }
}

/// Downloaded reference file and the system it came from
#[derive(Debug, Clone)]
pub struct EmapaDownload {
    pub path: PathBuf,
    pub source: String,
}

fn decode(raw: &str) -> String {
    let text = raw.trim();
    quick_xml::escape::unescape(text)
        .unwrap_or(Cow::Borrowed(text))
        .into_owned()
}

fn cell_text(cell: &str) -> String {
    decode(&TAG_REGEX.replace_all(cell, ""))
}

/// Find the index row of a commune.
///
/// The index uses 6-character TERYT ids; the commune type digit of a
/// 7-character TERC id is dropped before matching.
pub fn find_commune_entry(html: &str, teryt_terc: &str) -> Result<EmapaEntry> {
    let teryt = match teryt_terc.len() {
        7 => teryt_terc.get(..6).unwrap_or(teryt_terc),
        _ => teryt_terc,
    };

    for row in ROW_REGEX.captures_iter(html) {
        let cells: Vec<&str> = CELL_REGEX
            .captures_iter(&row[1])
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if cells.len() != COLUMN_COUNT || cell_text(cells[TERYT_COLUMN]) != teryt {
            continue;
        }

        let csv_url = HREF_REGEX
            .captures(cells[CSV_COLUMN])
            .map(|c| decode(&c[1]))
            .filter(|url| !url.is_empty());
        let local_system_url = ANCHOR_REGEX
            .captures(cells[LOCAL_SYSTEM_COLUMN])
            .map(|c| cell_text(&c[1]))
            .unwrap_or_default();
        debug!("Parsed columns: {} {:?} {}", teryt, csv_url, local_system_url);

        if let Some(csv_url) = csv_url {
            return Ok(EmapaEntry {
                csv_url,
                local_system_url,
            });
        }
        break;
    }

    Err(ReconcileError::TerytNotFound(teryt_terc.to_string()))
}

/// Index row of a commune served by an e-mapa system
pub fn find_emapa_entry(html: &str, teryt_terc: &str) -> Result<EmapaEntry> {
    let entry = find_commune_entry(html, teryt_terc)?;
    if !entry.is_emapa() {
        return Err(ReconcileError::EmapaServiceNotFound(entry.local_system_url));
    }
    Ok(entry)
}

/// `source:addr` value implied by a downloaded file name
/// (`gminaxyz.e-mapa.net.csv` or `.csv.gz`)
pub fn source_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".gz").unwrap_or(name);
    let stem = stem.strip_suffix(".csv")?;
    stem.contains("e-mapa").then(|| stem.to_string())
}

pub struct EmapaDownloader {
    client: Client,
    index_url: String,
}

impl EmapaDownloader {
    pub fn new(config: &EmapaConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("addr-reconcile/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            index_url: config.index_url.clone(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ReconcileError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Look up the commune in the index
    pub async fn fetch_entry(&self, teryt_terc: &str) -> Result<EmapaEntry> {
        let body = self.get_bytes(&self.index_url).await?;
        find_emapa_entry(&String::from_utf8_lossy(&body), teryt_terc)
    }

    /// Download the commune's CSV export into `output_dir`
    pub async fn download(&self, teryt_terc: &str, output_dir: &Path) -> Result<EmapaDownload> {
        info!("Downloading emapa csv data...");
        let entry = self.fetch_entry(teryt_terc).await?;

        let file_name = format!("{}.csv", entry.local_system_url.replace('/', "_"));
        let path = output_dir.join(file_name);

        let content = self.get_bytes(&entry.csv_url).await?;
        tokio::fs::create_dir_all(output_dir).await?;
        tokio::fs::write(&path, &content).await?;

        info!("Saved {} to {}", entry.csv_url, path.display());
        Ok(EmapaDownload {
            path,
            source: entry.local_system_url,
        })
    }
}
