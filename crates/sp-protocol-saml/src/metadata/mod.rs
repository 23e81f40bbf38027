//! Identity provider metadata.
//!
//! The store is filled once at startup from a directory of `EntityDescriptor`
//! files and is read-only afterwards, so it can be shared behind an `Arc`
//! without locking.

mod descriptor;

pub use descriptor::{
    Credential, CredentialUsage, IdentityProviderDescriptor, TrustAnchor,
};
pub(crate) use descriptor::strip_whitespace;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{SamlError, SamlResult};

/// Parsed IdP descriptors keyed by entityId.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    idps: HashMap<String, IdentityProviderDescriptor>,
}

impl MetadataStore {
    /// Loads every regular file in `dir` as IdP metadata.
    ///
    /// Files are read in name order. Subdirectories are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the directory cannot be read, any
    /// file fails to parse, or two files describe the same entity. A failed
    /// load yields no store at all.
    pub fn load(dir: impl AsRef<Path>) -> SamlResult<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            SamlError::Config(format!("cannot read metadata dir {}: {e}", dir.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SamlError::Config(e.to_string()))?;
            let file_type = entry
                .file_type()
                .map_err(|e| SamlError::Config(e.to_string()))?;
            if file_type.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut descriptors = Vec::with_capacity(paths.len());
        for path in &paths {
            let xml = fs::read_to_string(path)
                .map_err(|e| SamlError::Config(format!("{}: {e}", path.display())))?;
            let descriptor = IdentityProviderDescriptor::from_xml(&xml).map_err(|e| {
                SamlError::Config(format!("{}: {}", path.display(), config_message(e)))
            })?;
            tracing::info!(
                path = %path.display(),
                entity_id = %descriptor.entity_id,
                "loaded IdP metadata"
            );
            descriptors.push(descriptor);
        }

        let store = Self::from_descriptors(descriptors)?;
        tracing::info!(count = store.len(), dir = %dir.display(), "metadata store ready");
        Ok(store)
    }

    /// Builds a store from already parsed descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] on a duplicate entityId.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = IdentityProviderDescriptor>,
    ) -> SamlResult<Self> {
        let mut idps = HashMap::new();
        for descriptor in descriptors {
            let entity_id = descriptor.entity_id.clone();
            if idps.insert(entity_id.clone(), descriptor).is_some() {
                return Err(SamlError::Config(format!(
                    "duplicate metadata for entity {entity_id}"
                )));
            }
        }
        Ok(Self { idps })
    }

    /// Looks up an IdP by entityId.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownIdp`] if no descriptor is loaded for it.
    pub fn lookup(&self, entity_id: &str) -> SamlResult<&IdentityProviderDescriptor> {
        self.idps
            .get(entity_id)
            .ok_or_else(|| SamlError::UnknownIdp(entity_id.to_string()))
    }

    /// Number of loaded descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.idps.len()
    }

    /// Returns true if no descriptor is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idps.is_empty()
    }

    /// Loaded entityIds, unordered.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.idps.keys().map(String::as_str)
    }
}

fn config_message(err: SamlError) -> String {
    match err {
        SamlError::Config(msg) => msg,
        other => other.to_string(),
    }
}
