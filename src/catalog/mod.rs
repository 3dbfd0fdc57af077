pub mod loader;

pub use loader::{AssetError, AssetLoader, LoadPoll, LoadTicket, SimulatedAssetLoader};

use crate::config::CatalogConfig;
use crate::scene::SceneSubtree;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded, read-only placeable definition.
#[derive(Debug, Clone)]
pub struct ModelTemplate {
    index: usize,
    asset: AssetRef,
    base_scale: f32,
    prototype: SceneSubtree,
}

impl ModelTemplate {
    pub fn new(index: usize, asset: AssetRef, base_scale: f32, prototype: SceneSubtree) -> Self {
        Self {
            index,
            asset,
            base_scale,
            prototype,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn asset(&self) -> &AssetRef {
        &self.asset
    }

    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    /// Fresh, independently owned copy of the template's scene subtree.
    pub fn instantiate(&self) -> SceneSubtree {
        self.prototype.clone()
    }
}

#[derive(Debug, Clone)]
pub enum TemplateSlot {
    Unrequested,
    Pending(LoadTicket),
    Loaded(ModelTemplate),
    /// Load failed; the slot stays selectable but can never be placed.
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog index {index} is out of range for {len} entries")]
    InvalidSelection { index: isize, len: usize },
}

#[derive(Debug, Clone)]
struct Entry {
    asset: AssetRef,
    base_scale: f32,
    slot: TemplateSlot,
}

/// Ordered template slots plus the choice used for the next placement.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
    chosen: usize,
}

impl Catalog {
    pub fn from_config(config: &CatalogConfig) -> Self {
        let entries = config
            .entries
            .iter()
            .map(|entry| Entry {
                asset: AssetRef::new(entry.asset.clone()),
                base_scale: entry.base_scale,
                slot: TemplateSlot::Unrequested,
            })
            .collect();
        Self { entries, chosen: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&TemplateSlot> {
        self.entries.get(index).map(|entry| &entry.slot)
    }

    pub fn templates(&self) -> impl Iterator<Item = &TemplateSlot> {
        self.entries.iter().map(|entry| &entry.slot)
    }

    pub fn template(&self, index: usize) -> Option<&ModelTemplate> {
        match self.slot(index)? {
            TemplateSlot::Loaded(template) => Some(template),
            _ => None,
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.templates()
            .filter(|slot| matches!(slot, TemplateSlot::Loaded(_)))
            .count()
    }

    pub fn chosen(&self) -> usize {
        self.chosen
    }

    pub fn chosen_template(&self) -> Option<&ModelTemplate> {
        self.template(self.chosen)
    }

    /// Chooses the template for the next placement. Out-of-range indexes,
    /// negative ones included, leave the choice untouched.
    pub fn select(&mut self, index: isize) -> Result<usize, CatalogError> {
        let len = self.entries.len();
        match usize::try_from(index) {
            Ok(valid) if valid < len => {
                self.chosen = valid;
                log::debug!("[catalog] chose {} ({})", valid, self.entries[valid].asset);
                Ok(valid)
            }
            _ => Err(CatalogError::InvalidSelection { index, len }),
        }
    }

    /// Starts a load for every slot that has never been requested.
    pub fn request_loads<L: AssetLoader + ?Sized>(&mut self, loader: &mut L) {
        for entry in &mut self.entries {
            if matches!(entry.slot, TemplateSlot::Unrequested) {
                entry.slot = TemplateSlot::Pending(loader.begin_load(&entry.asset));
            }
        }
    }

    /// Collects finished loads. Returns how many slots resolved on this call.
    pub fn poll_loads<L: AssetLoader + ?Sized>(&mut self, loader: &mut L) -> usize {
        let mut resolved = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let TemplateSlot::Pending(ticket) = entry.slot else {
                continue;
            };
            match loader.poll(ticket) {
                LoadPoll::Pending => {}
                LoadPoll::Loaded(prototype) => {
                    log::info!("[catalog] loaded {} into slot {index}", entry.asset);
                    entry.slot = TemplateSlot::Loaded(ModelTemplate::new(
                        index,
                        entry.asset.clone(),
                        entry.base_scale,
                        prototype,
                    ));
                    resolved += 1;
                }
                LoadPoll::Failed(err) => {
                    log::warn!("[catalog] slot {index} left empty: {err}");
                    entry.slot = TemplateSlot::Failed;
                    resolved += 1;
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogEntry;

    fn catalog(assets: &[&str]) -> Catalog {
        let config = CatalogConfig::new(
            assets
                .iter()
                .map(|asset| CatalogEntry::new(*asset, 1.0))
                .collect(),
        )
        .expect("valid catalog");
        Catalog::from_config(&config)
    }

    #[test]
    fn select_rejects_out_of_range_and_keeps_choice() {
        let mut catalog = catalog(&["a.glb", "b.glb", "c.glb"]);
        assert_eq!(catalog.select(2), Ok(2));

        assert_eq!(
            catalog.select(-1),
            Err(CatalogError::InvalidSelection { index: -1, len: 3 })
        );
        assert_eq!(
            catalog.select(3),
            Err(CatalogError::InvalidSelection { index: 3, len: 3 })
        );
        assert_eq!(catalog.chosen(), 2);
    }

    #[test]
    fn empty_catalog_rejects_every_selection() {
        let mut catalog = catalog(&[]);
        assert!(catalog.select(0).is_err());
        assert!(catalog.chosen_template().is_none());
    }

    #[test]
    fn loads_resolve_across_polls() {
        let mut catalog = catalog(&["a.glb", "b.glb"]);
        let mut loader = SimulatedAssetLoader::new().with_latency(1);

        catalog.request_loads(&mut loader);
        catalog.request_loads(&mut loader);
        assert_eq!(loader.loads_started(), 2);

        assert_eq!(catalog.poll_loads(&mut loader), 0);
        assert!(catalog.chosen_template().is_none());
        assert_eq!(catalog.poll_loads(&mut loader), 2);

        let template = catalog.chosen_template().expect("loaded");
        assert_eq!(template.index(), 0);
        assert_eq!(template.asset().as_str(), "a.glb");
        assert_eq!(catalog.loaded_count(), 2);
    }

    #[test]
    fn failed_slot_stays_selectable_but_empty() {
        let mut catalog = catalog(&["a.glb", "broken.glb", "garbled.glb"]);
        let mut loader = SimulatedAssetLoader::new()
            .with_latency(0)
            .failing("broken.glb")
            .corrupt("garbled.glb");
        catalog.request_loads(&mut loader);
        assert_eq!(catalog.poll_loads(&mut loader), 3);

        assert_eq!(catalog.select(1), Ok(1));
        assert!(matches!(catalog.slot(1), Some(TemplateSlot::Failed)));
        assert!(matches!(catalog.slot(2), Some(TemplateSlot::Failed)));
        assert!(catalog.chosen_template().is_none());
        assert_eq!(catalog.loaded_count(), 1);

        // failed slots are never polled again
        assert_eq!(catalog.poll_loads(&mut loader), 0);
    }

    #[test]
    fn instantiate_returns_independent_copies() {
        let prototype = SceneSubtree::new("root").with_bounds(1.0);
        let template = ModelTemplate::new(0, AssetRef::new("x.glb"), 0.1, prototype);
        let mut first = template.instantiate();
        first.label.push_str("-edited");
        assert_eq!(template.instantiate().label, "root");
    }
}
