use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rendering applied to the harness's own telemetry on stderr.
///
/// This governs only supervision diagnostics; captured sandbox output always
/// goes to the log artefact verbatim, whatever format is selected here.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON document per event, for CI log collectors.
    Json,
    /// Terse single-line output for humans watching the run.
    #[default]
    Compact,
}
