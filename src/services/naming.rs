//! Name formatting for replicated tiles.
//!
//! A replication name such as `"My App"` is embedded in two places with
//! different conventions:
//! - tile identities use hyphenated slugs (`p-isolation-segment-my-app`)
//! - job types and service names use underscores (`isolated_router_my_app`)
//!
//! The two forms are not interchangeable.

/// Characters treated as word separators in a replication name
const SEPARATORS: [char; 3] = ['-', '_', ' '];

/// Format a replication name for job type and service identifiers.
///
/// Every `-`, `_` and space becomes `_`, then the result is lowercased.
///
/// ```
/// use tile_replicator::services::naming::format_job_suffix;
/// assert_eq!(format_job_suffix("My App"), "my_app");
/// ```
pub fn format_job_suffix(name: &str) -> String {
    join_with(name, '_')
}

/// Format a replication name for the tile identity (`name` metadata field).
///
/// Every `-`, `_` and space becomes `-`, then the result is lowercased.
///
/// ```
/// use tile_replicator::services::naming::format_tile_suffix;
/// assert_eq!(format_tile_suffix("My_App"), "my-app");
/// ```
pub fn format_tile_suffix(name: &str) -> String {
    join_with(name, '-')
}

fn join_with(name: &str, separator: char) -> String {
    name.replace(SEPARATORS, &separator.to_string())
        .to_lowercase()
}
