//! Artifact naming: `{prefix}{DD-MM-YYYY-hh-mm-ss}.snap`, rendered in the display timezone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const SNAPSHOT_EXTENSION: &str = ".snap";

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y-%H-%M-%S";

/// Build the artifact filename for a snapshot taken at `at`.
pub fn artifact_filename(prefix: &str, at: DateTime<Utc>, timezone: Tz) -> String {
    format!(
        "{}{}{}",
        prefix,
        at.with_timezone(&timezone).format(TIMESTAMP_FORMAT),
        SNAPSHOT_EXTENSION
    )
}
