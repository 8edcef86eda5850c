// TOML-file preference store for user display settings
use crate::application::telemetry_repository::PreferenceStore;
use crate::domain::units::{UnitRegistry, UNIT_GROUPS};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct FilePreferenceStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FilePreferenceStore {
    /// Opens the store, reading any existing preference file. A missing file
    /// is an empty store, not an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading preferences {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing preferences {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("preference lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("preference lock");
        entries.insert(key.to_string(), value.to_string());
        let text = toml::to_string(&*entries).context("serializing preferences")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing preferences {}", self.path.display()))?;
        Ok(())
    }
}

/// Builds the unit registry from the stored selections.
pub fn load_unit_registry(store: &dyn PreferenceStore) -> UnitRegistry {
    let mut stored = HashMap::new();
    for group in UNIT_GROUPS {
        if let Some(index) = store
            .get(&UnitRegistry::pref_key(group.name))
            .and_then(|v| v.parse::<usize>().ok())
        {
            stored.insert(group.name.to_string(), index);
        }
    }
    UnitRegistry::from_indices(&stored)
}

/// Advances a group to its next unit and persists the selection.
pub fn cycle_unit(
    registry: &mut UnitRegistry,
    store: &dyn PreferenceStore,
    group: &str,
) -> Result<()> {
    if let Some(index) = registry.cycle(group) {
        store.set(&UnitRegistry::pref_key(group), &index.to_string())?;
    }
    Ok(())
}
