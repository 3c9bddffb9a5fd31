//! Error types for the reconciliation library.

use thiserror::Error;

/// Hard failures of the collaborators around the matching core.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PBF error: {0}")]
    Pbf(#[from] osmpbfreader::Error),

    #[error("Node store error: {0}")]
    NodeStore(#[from] sled::Error),

    #[error("Invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Incorrect teryt_terc: {0}")]
    TerytNotFound(String),

    #[error("No administrative boundary tagged teryt:terc={0} in the extract")]
    BoundaryNotFound(String),

    #[error("Commune does not publish addresses through e-mapa: {0}")]
    EmapaServiceNotFound(String),

    #[error("Unexpected status code {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Download from {url} failed after {attempts} attempts")]
    DownloadFailed { url: String, attempts: u32 },
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Why a single source record was dropped instead of becoming an address.
///
/// Loaders never abort a batch on these; they log and count them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("object has no tags")]
    NoTags,

    #[error("could not resolve geometry")]
    NoGeometry,

    #[error("malformed record: {0}")]
    Malformed(String),
}
