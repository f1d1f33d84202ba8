//! Runtime configuration: built-in defaults, overridden by `CATALOG_HUB_*`
//! environment variables, overridden by command-line flags in `main`.

use anyhow::{bail, Context, Result};
use catalog_hub_core::hierarchy::{HierarchyConfig, MaterializeMode, DEFAULT_MAX_DEPTH};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Collection names behind each entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collections {
    pub categories: String,
    pub platform_categories: String,
    pub personas: String,
    pub properties: String,
    pub platform_properties: String,
    pub stuff: String,
    pub users: String,
    pub user_relations: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            categories: "category_categories".into(),
            platform_categories: "platform_categories".into(),
            personas: "personas".into(),
            properties: "properties".into(),
            platform_properties: "platform_properties".into(),
            stuff: "my_stuff".into(),
            users: "users".into(),
            user_relations: "user_relations".into(),
        }
    }
}

/// Result-size ceilings for the bulk reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub pending_sync: usize,
    pub pending_index: usize,
    pub connections: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            pending_sync: 500,
            pending_index: 50,
            connections: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub hierarchy: HierarchyConfig,
    pub limits: Limits,
    pub collections: Collections,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Limits::default();
        let addr: Option<SocketAddr> = parse_var(&lookup, "CATALOG_HUB_ADDR")?;
        let max_depth: Option<usize> = parse_var(&lookup, "CATALOG_HUB_MAX_DEPTH")?;
        let pending_sync: Option<usize> = parse_var(&lookup, "CATALOG_HUB_PENDING_SYNC_LIMIT")?;
        let pending_index: Option<usize> = parse_var(&lookup, "CATALOG_HUB_PENDING_INDEX_LIMIT")?;
        let connections: Option<usize> = parse_var(&lookup, "CATALOG_HUB_CONNECTIONS_LIMIT")?;
        let mode = match lookup("CATALOG_HUB_MATERIALIZE_MODE") {
            Some(raw) => raw
                .trim()
                .parse::<MaterializeMode>()
                .map_err(anyhow::Error::msg)
                .context("invalid CATALOG_HUB_MATERIALIZE_MODE")?,
            None => MaterializeMode::default(),
        };

        let config = Self {
            addr: match addr {
                Some(addr) => addr,
                None => DEFAULT_ADDR.parse::<SocketAddr>()?,
            },
            data_dir: lookup("CATALOG_HUB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            hierarchy: HierarchyConfig {
                max_depth: max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
                mode,
            },
            limits: Limits {
                pending_sync: pending_sync.unwrap_or(defaults.pending_sync),
                pending_index: pending_index.unwrap_or(defaults.pending_index),
                connections: connections.unwrap_or(defaults.connections),
            },
            collections: Collections::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hierarchy.max_depth == 0 {
            bail!("max depth must be at least 1");
        }
        if self.limits.pending_sync == 0 {
            bail!("pending sync limit must be at least 1");
        }
        if self.limits.pending_index == 0 {
            bail!("pending index limit must be at least 1");
        }
        if self.limits.connections == 0 {
            bail!("connections limit must be at least 1");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("invalid {name}: {raw:?}")))
        .transpose()
}
