//! Application settings loaded from config.toml
//!
//! The file holds the versioned pricing policy plus the deliverable catalog and
//! package definitions used to seed the database on start. Seeding is idempotent
//! (see [`crate::core::catalog::seed_catalog`]), so the file can be re-applied on
//! every boot.

use crate::core::pricing::PricingPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Pricing policy; built-in defaults apply when the table is missing
    #[serde(default)]
    pub pricing: PricingPolicy,
    /// Catalog deliverables to seed
    #[serde(default)]
    pub deliverables: Vec<DeliverableSeed>,
    /// Packages to seed
    #[serde(default)]
    pub packages: Vec<PackageSeed>,
}

/// Seed entry for a single catalog deliverable
#[derive(Debug, Deserialize, Clone)]
pub struct DeliverableSeed {
    /// Unique catalog name
    pub name: String,
    /// Client-facing description
    #[serde(default)]
    pub description: String,
    /// Grouping (e.g., "design", "engineering")
    pub category: String,
    /// Free-text scope
    #[serde(default)]
    pub scope: String,
    /// Complexity estimate in points
    pub points: f64,
    /// Fixed hour estimate
    #[serde(default)]
    pub fixed_hours: f64,
    /// Fixed standalone price
    #[serde(default)]
    pub fixed_price: f64,
    /// Whether the deliverable can be selected
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Seed entry for a package
#[derive(Debug, Deserialize, Clone)]
pub struct PackageSeed {
    /// Unique URL key
    pub slug: String,
    /// Display name
    pub name: String,
    /// Marketing description
    #[serde(default)]
    pub description: String,
    /// Exact price override
    pub flat_fee: Option<f64>,
    /// Exact hours override
    pub flat_hours: Option<f64>,
    /// Percentage off the computed subtotal
    pub discount_percentage: Option<f64>,
    /// Line items, in display order
    #[serde(default)]
    pub items: Vec<PackageItemSeed>,
}

/// Seed entry for a package line item, referencing a deliverable by name
#[derive(Debug, Deserialize, Clone)]
pub struct PackageItemSeed {
    /// Name of a deliverable from the catalog
    pub deliverable: String,
    /// How many of the deliverable the package includes
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Complexity override (2.5 is standard)
    pub complexity_score: Option<f64>,
}

const fn default_true() -> bool {
    true
}

const fn default_quantity() -> i32 {
    1
}

/// Parses settings from a TOML string and validates the pricing policy.
///
/// # Errors
/// Returns `Error::Config` if the TOML is invalid or the pricing policy is rejected
/// by [`PricingPolicy::validate`].
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.pricing.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The pricing policy is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings, falling back to defaults when the file does not exist.
///
/// A file that exists but fails to parse is still an error.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        warn!(
            "Config file {} not found; using built-in pricing policy and an empty catalog",
            path_ref.display()
        );
        return Ok(Settings::default());
    }
    load_settings(path_ref)
}
