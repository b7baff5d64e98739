//! Lab item catalog
//!
//! Warehouse lab tables identify measurements by an item id rather than an
//! analyte tag. The catalog resolves item ids to analytes, either from the
//! lab item dictionary (label and category text) or from explicit ids.

use std::path::Path;

use log::info;
use rustc_hash::FxHashMap;

use super::columns::{extract_i64, extract_string};
use super::parquet::read_parquet_dir;
use crate::models::Analyte;

/// One entry of the lab item dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabItem {
    /// Item identifier
    pub itemid: i64,
    /// Item label, e.g. "Lactate" or "pH"
    pub label: String,
    /// Item category, e.g. "Blood Gas"
    pub category: String,
}

impl LabItem {
    /// Analyte the dictionary entry measures, if any
    ///
    /// A label containing "lactate" is lactate; a label containing "ph" with a
    /// blood category is pH. Matching is case-insensitive.
    #[must_use]
    pub fn analyte(&self) -> Option<Analyte> {
        let label = self.label.to_lowercase();
        if label.contains("lactate") {
            return Some(Analyte::Lactate);
        }
        if label.contains("ph") && self.category.to_lowercase().contains("blood") {
            return Some(Analyte::Ph);
        }
        None
    }
}

/// Resolves lab item ids to analytes
#[derive(Debug, Clone, Default)]
pub struct AnalyteCatalog {
    items: FxHashMap<i64, Analyte>,
}

impl AnalyteCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from dictionary entries, keeping those that measure an analyte
    #[must_use]
    pub fn from_lab_items(items: impl IntoIterator<Item = LabItem>) -> Self {
        let mut catalog = Self::new();
        for item in items {
            if let Some(analyte) = item.analyte() {
                catalog.insert(item.itemid, analyte);
            }
        }
        catalog
    }

    /// Build a catalog from explicit item id lists
    #[must_use]
    pub fn from_item_ids(lactate: &[i64], ph: &[i64]) -> Self {
        let mut catalog = Self::new();
        for id in lactate {
            catalog.insert(*id, Analyte::Lactate);
        }
        for id in ph {
            catalog.insert(*id, Analyte::Ph);
        }
        catalog
    }

    /// Load the lab item dictionary (`itemid`, `label`, `category`) from Parquet
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut items = Vec::new();
        for batch in read_parquet_dir(path, "loading lab item dictionary")? {
            let ids = extract_i64(&batch, &["itemid"])?;
            let labels = extract_string(&batch, &["label"])?;
            let categories = extract_string(&batch, &["category"])?;
            for ((itemid, label), category) in ids.into_iter().zip(labels).zip(categories) {
                if let (Some(itemid), Some(label)) = (itemid, label) {
                    items.push(LabItem {
                        itemid,
                        label,
                        category: category.unwrap_or_default(),
                    });
                }
            }
        }

        let catalog = Self::from_lab_items(items);
        info!(
            "Lab item catalog: {} lactate items, {} pH items",
            catalog.item_ids(Analyte::Lactate).len(),
            catalog.item_ids(Analyte::Ph).len()
        );
        Ok(catalog)
    }

    /// Map an item id to an analyte, replacing any previous mapping
    pub fn insert(&mut self, itemid: i64, analyte: Analyte) {
        self.items.insert(itemid, analyte);
    }

    /// Analyte measured by an item id
    #[must_use]
    pub fn resolve(&self, itemid: i64) -> Option<Analyte> {
        self.items.get(&itemid).copied()
    }

    /// Sorted item ids mapped to an analyte
    #[must_use]
    pub fn item_ids(&self, analyte: Analyte) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .items
            .iter()
            .filter(|(_, mapped)| **mapped == analyte)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Whether the catalog maps no item ids
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
