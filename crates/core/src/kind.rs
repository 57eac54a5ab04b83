use serde::{Deserialize, Serialize};

/// Traffic direction. Selects the raw table and the statistics column a
/// write or read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Upload,
    Download,
}

/// What a kind means for the pipeline: append a raw row per event, bump the
/// running total per event, or answer a totals query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClass {
    Raw,
    Statistics,
    Totals,
}

/// The closed set of event types nodes may send.
///
/// Wire names are fixed (note the lowercase statistics variants — they are
/// part of the protocol). Parsing any other string is a protocol error.
/// The derive order is the group-key order the aggregator processes
/// flushed groups in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    BandwidthUpload,
    BandwidthDownload,
    #[serde(rename = "bandwidthUploadStatistics")]
    BandwidthUploadStatistics,
    #[serde(rename = "bandwidthDownloadStatistics")]
    BandwidthDownloadStatistics,
    BandwidthUploadTotal,
    BandwidthDownloadTotal,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::BandwidthUpload,
        EventKind::BandwidthDownload,
        EventKind::BandwidthUploadStatistics,
        EventKind::BandwidthDownloadStatistics,
        EventKind::BandwidthUploadTotal,
        EventKind::BandwidthDownloadTotal,
    ];

    /// Resolve a wire name to a kind. `None` for anything outside the
    /// registry.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BandwidthUpload" => Some(EventKind::BandwidthUpload),
            "BandwidthDownload" => Some(EventKind::BandwidthDownload),
            "bandwidthUploadStatistics" => Some(EventKind::BandwidthUploadStatistics),
            "bandwidthDownloadStatistics" => Some(EventKind::BandwidthDownloadStatistics),
            "BandwidthUploadTotal" => Some(EventKind::BandwidthUploadTotal),
            "BandwidthDownloadTotal" => Some(EventKind::BandwidthDownloadTotal),
            _ => None,
        }
    }

    /// The wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BandwidthUpload => "BandwidthUpload",
            EventKind::BandwidthDownload => "BandwidthDownload",
            EventKind::BandwidthUploadStatistics => "bandwidthUploadStatistics",
            EventKind::BandwidthDownloadStatistics => "bandwidthDownloadStatistics",
            EventKind::BandwidthUploadTotal => "BandwidthUploadTotal",
            EventKind::BandwidthDownloadTotal => "BandwidthDownloadTotal",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            EventKind::BandwidthUpload
            | EventKind::BandwidthUploadStatistics
            | EventKind::BandwidthUploadTotal => Direction::Upload,
            EventKind::BandwidthDownload
            | EventKind::BandwidthDownloadStatistics
            | EventKind::BandwidthDownloadTotal => Direction::Download,
        }
    }

    pub fn class(&self) -> KindClass {
        match self {
            EventKind::BandwidthUpload | EventKind::BandwidthDownload => KindClass::Raw,
            EventKind::BandwidthUploadStatistics | EventKind::BandwidthDownloadStatistics => {
                KindClass::Statistics
            }
            EventKind::BandwidthUploadTotal | EventKind::BandwidthDownloadTotal => {
                KindClass::Totals
            }
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
