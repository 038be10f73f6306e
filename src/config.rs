// ⚙️ Pipeline configuration
// Everything has a default; a TOML file only needs the keys it overrides.

use crate::errors::ConfigError;
use crate::load::WriteStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// How retail records are grouped into monthly summaries.
///
/// Each granularity has its own analytics table so the uniqueness key always
/// matches the grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetailGranularity {
    /// (month, product) - national median per product
    #[default]
    Product,
    /// (month, region, brand, product)
    RegionBrandProduct,
}

/// Raw retail product name → standardized name.
///
/// Keys are matched lowercase. An empty value means "not available"
/// (the row is rejected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCatalog(BTreeMap<String, String>);

/// Outcome of a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductLookup {
    Mapped(String),
    NotAvailable,
    Unmapped,
}

impl ProductCatalog {
    pub fn empty() -> Self {
        ProductCatalog(BTreeMap::new())
    }

    /// Builder pattern: add one mapping
    pub fn with_entry(mut self, raw: &str, canonical: &str) -> Self {
        self.0.insert(raw.trim().to_lowercase(), canonical.to_string());
        self
    }

    pub fn lookup(&self, raw: &str) -> ProductLookup {
        match self.0.get(&raw.trim().to_lowercase()) {
            Some(canonical) if canonical.is_empty() => ProductLookup::NotAvailable,
            Some(canonical) => ProductLookup::Mapped(canonical.clone()),
            None => ProductLookup::Unmapped,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ProductCatalog {
    /// Product names published by the national energy secretariat
    fn default() -> Self {
        ProductCatalog::empty()
            .with_entry("nafta (super) entre 92 y 95 ron", "NAFTA GRADO 2")
            .with_entry("nafta (premium) de más de 95 ron", "NAFTA GRADO 3")
            .with_entry("nafta (común) hasta 92 ron", "NAFTA GRADO 1")
            .with_entry("gas oil grado 2", "GASOIL GRADO 2")
            .with_entry("gas oil grado 3", "GASOIL GRADO 3")
            .with_entry("gnc", "GNC")
            .with_entry("kerosene", "KEROSENE")
            .with_entry("glpa", "GLPA")
            .with_entry("n/d", "")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub retail_granularity: RetailGranularity,
    pub staging_strategy: WriteStrategy,
    pub analytics_strategy: WriteStrategy,
    /// Reject retail rows whose product is not in the catalog. When off,
    /// unknown names are kept trimmed and upper-cased.
    pub drop_unmapped_products: bool,
    pub product_catalog: ProductCatalog,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            retail_granularity: RetailGranularity::default(),
            staging_strategy: WriteStrategy::Replace,
            analytics_strategy: WriteStrategy::Replace,
            drop_unmapped_products: true,
            product_catalog: ProductCatalog::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
