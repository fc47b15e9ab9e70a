//! Rewrite rules for each supported tile type.
//!
//! Rules work on the serialized metadata text, not on the parsed document.
//! Downstream tooling matches on exact job type names and line shapes, so the
//! rewrites are plain substring substitutions and must stay that way.
//!
//! [`TILE_RULES`] is both the allow-list of tiles the replicator accepts and
//! the dispatch table for their rewrites.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

// Isolation segment job types
const IST_CELL_JOB_TYPE: &str = "isolated_diego_cell";
const IST_HA_PROXY_JOB_TYPE: &str = "isolated_ha_proxy";
const IST_ROUTER_JOB_TYPE: &str = "isolated_router";

// Windows runtime job types
const WRT_CELL_JOB_TYPE: &str = "windows_diego_cell";

// MongoDB on-demand identifiers
const MONGO_BROKER_JOB_TYPE: &str = "mongodb_broker";
const MONGO_DNS_ALIASES_JOB: &str = "      name: mongodb-dns-aliases";
const MONGO_DNS_TILE_ALIAS: &str = "mongodb-dns-aliases-tile";
const MONGO_DNS_DIEGO_ALIAS: &str = "mongodb-dns-aliases-diego";
const MONGO_BROKER_NAME: &str = "broker_name: mongodb-odb";
const MONGO_SERVICE_NAME: &str = "service_name: mongodb-odb";
const MONGO_EMPTY_RUNTIME_CONFIGS: &str = "runtime_configs: []";

/// Everything from `runtime_configs:` through the last `version: 1.2.6`.
///
/// The dots are escaped so only that exact release version anchors the match,
/// where an unescaped `1.2.6` would also accept e.g. `1x2y6`.
static MONGO_RUNTIME_CONFIGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)runtime_configs:.*version: 1\.2\.6").expect("Invalid runtime config regex")
});

/// Rewrite applied to serialized metadata: `(metadata, job_suffix) -> metadata`
pub type RewriteFn = fn(&str, &str) -> String;

/// A supported tile and how its metadata is rewritten
#[derive(Debug, Clone, Copy)]
pub struct TileRule {
    /// Original tile identity (`name` in the metadata)
    pub identity: &'static str,

    /// Rewrite applied after `name` and `label` have been updated
    pub rewrite: RewriteFn,

    /// The rewrite removes the tile's runtime configuration, so the duplicate
    /// only works next to the original tile
    pub strips_runtime_config: bool,
}

/// Supported tiles, in the order they are listed to users
pub const TILE_RULES: &[TileRule] = &[
    TileRule {
        identity: "p-isolation-segment",
        rewrite: rewrite_isolation_segment,
        strips_runtime_config: false,
    },
    TileRule {
        identity: "p-windows-runtime",
        rewrite: rewrite_windows_runtime,
        strips_runtime_config: false,
    },
    TileRule {
        identity: "pas-windows",
        rewrite: rewrite_windows_runtime,
        strips_runtime_config: false,
    },
    TileRule {
        identity: "mongodb-on-demand",
        rewrite: rewrite_mongodb_on_demand,
        strips_runtime_config: true,
    },
];

/// Look up the rule for a tile identity
pub fn find_rule(identity: &str) -> Option<&'static TileRule> {
    TILE_RULES.iter().find(|rule| rule.identity == identity)
}

/// Identities of every supported tile
pub fn supported_tiles() -> Vec<&'static str> {
    TILE_RULES.iter().map(|rule| rule.identity).collect()
}

/// Isolation segment: suffix the cell, HA proxy and router job types.
pub fn rewrite_isolation_segment(metadata: &str, name: &str) -> String {
    let rewritten = append_suffix(metadata, IST_CELL_JOB_TYPE, '_', name);
    let rewritten = append_suffix(&rewritten, IST_HA_PROXY_JOB_TYPE, '_', name);
    append_suffix(&rewritten, IST_ROUTER_JOB_TYPE, '_', name)
}

/// Windows runtime (both tile flavours): suffix the windows cell job type.
pub fn rewrite_windows_runtime(metadata: &str, name: &str) -> String {
    append_suffix(metadata, WRT_CELL_JOB_TYPE, '_', name)
}

/// MongoDB on-demand: qualify the DNS alias jobs, broker and service names,
/// drop the embedded runtime configuration and suffix the broker job type.
pub fn rewrite_mongodb_on_demand(metadata: &str, name: &str) -> String {
    let qualified = format!("mongodb-{}", name);

    let rewritten = metadata.replace(
        MONGO_DNS_ALIASES_JOB,
        &MONGO_DNS_ALIASES_JOB.replace("mongodb", &qualified),
    );
    let rewritten = rewritten.replace(
        MONGO_DNS_TILE_ALIAS,
        &MONGO_DNS_TILE_ALIAS.replace("mongodb", &qualified),
    );
    let rewritten = rewritten.replace(
        MONGO_DNS_DIEGO_ALIAS,
        &MONGO_DNS_DIEGO_ALIAS.replace("mongodb", &qualified),
    );
    let rewritten = append_suffix(&rewritten, MONGO_BROKER_NAME, '-', name);
    let rewritten = append_suffix(&rewritten, MONGO_SERVICE_NAME, '-', name);

    let rewritten = MONGO_RUNTIME_CONFIGS
        .replace_all(&rewritten, NoExpand(MONGO_EMPTY_RUNTIME_CONFIGS))
        .into_owned();

    append_suffix(&rewritten, MONGO_BROKER_JOB_TYPE, '_', name)
}

/// Replace every `token` with `token<separator><suffix>`.
///
/// An occurrence already spelled `token<separator><suffix>` and ending at an
/// identifier boundary is left alone, which keeps a rewrite stable when it is
/// applied to its own output. `isolated_router_api` with suffix `a` is still
/// rewritten to `isolated_router_a_api`.
fn append_suffix(text: &str, token: &str, separator: char, suffix: &str) -> String {
    let qualified = format!("{}{}{}", token, separator, suffix);
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(token) {
        let (before, from_token) = rest.split_at(pos);
        out.push_str(before);
        out.push_str(&qualified);

        let already_qualified = from_token
            .strip_prefix(qualified.as_str())
            .is_some_and(|after| !after.starts_with(is_identifier_char));
        let consumed = if already_qualified {
            qualified.len()
        } else {
            token.len()
        };
        rest = &from_token[consumed..];
    }

    out.push_str(rest);
    out
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
