//! Read-side queries over reconstructed aggregates.

use std::sync::Arc;

use common::{
    ConfigurationIdentifier, EnvironmentIdentifier, LayerIdentifier, Page, QueryRange,
    StructureIdentifier,
};
use domain::{
    Aggregate, ConfigEnvironment, ConfigKey, ConfigStructure, ConfigurationEvent,
    EnvironmentEvent, EnvironmentLayer, KeyCompletion, KeySelection, KeyStore, LayerEvent,
    ListedEvent, ObjectList, PreparedConfiguration, StructureEvent,
};
use event_store::Version;

use crate::error::Result;
use crate::store::DomainObjectStore;

/// An aggregate that owns a set of keys.
pub trait KeyOwner: Aggregate {
    /// The keys of the object, or None if the object does not exist.
    fn key_store(&self) -> Option<&KeyStore>;
}

impl KeyOwner for ConfigEnvironment {
    fn key_store(&self) -> Option<&KeyStore> {
        self.exists().then(|| self.keys())
    }
}

impl KeyOwner for EnvironmentLayer {
    fn key_store(&self) -> Option<&KeyStore> {
        self.exists().then(|| self.keys())
    }
}

impl KeyOwner for ConfigStructure {
    fn key_store(&self) -> Option<&KeyStore> {
        self.exists().then(|| self.keys())
    }
}

impl KeyOwner for PreparedConfiguration {
    fn key_store(&self) -> Option<&KeyStore> {
        self.exists().then(|| self.keys())
    }
}

/// Selection, paging and point-in-time bound of a key query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyQuery {
    /// Only keys whose path starts with this prefix (case-sensitive).
    pub filter: Option<String>,

    /// Prefix removed, together with one following `/`, from returned paths.
    pub remove_root: Option<String>,

    /// A key whose path equals this value is returned first.
    pub prefer_exact_match: Option<String>,

    pub range: QueryRange,

    /// Version to read at; None reads the latest state.
    pub target_version: Option<Version>,
}

impl KeyQuery {
    /// A query returning every key at the latest version.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn remove_root(mut self, root: impl Into<String>) -> Self {
        self.remove_root = Some(root.into());
        self
    }

    pub fn prefer_exact_match(mut self, path: impl Into<String>) -> Self {
        self.prefer_exact_match = Some(path.into());
        self
    }

    pub fn range(mut self, range: QueryRange) -> Self {
        self.range = range;
        self
    }

    pub fn at_version(mut self, version: Version) -> Self {
        self.target_version = Some(version);
        self
    }

    fn selection(&self) -> KeySelection {
        KeySelection {
            filter: self.filter.clone(),
            remove_root: self.remove_root.clone(),
            prefer_exact_match: self.prefer_exact_match.clone(),
        }
    }
}

/// Answers key, autocomplete and listing queries.
///
/// Objects that do not exist at the requested version yield empty pages.
#[derive(Clone)]
pub struct KeyQueryService {
    store: Arc<DomainObjectStore>,
}

impl KeyQueryService {
    pub fn new(store: Arc<DomainObjectStore>) -> Self {
        Self { store }
    }

    /// Returns `(path, value)` pairs of the selected keys.
    #[tracing::instrument(skip(self))]
    pub async fn get_keys<A: KeyOwner>(
        &self,
        id: A::Id,
        query: KeyQuery,
    ) -> Result<Page<(String, String)>> {
        let page = self.get_key_objects::<A>(id, query).await?;
        Ok(page.map(|key| (key.path, key.value)))
    }

    /// Returns the selected keys with all their attributes.
    #[tracing::instrument(skip(self))]
    pub async fn get_key_objects<A: KeyOwner>(
        &self,
        id: A::Id,
        query: KeyQuery,
    ) -> Result<Page<ConfigKey>> {
        let aggregate: A = self.store.replay_object(id, query.target_version).await?;
        Ok(match aggregate.key_store() {
            Some(keys) => keys.select(&query.selection(), query.range),
            None => Page::empty(),
        })
    }

    /// Completes a partial `/`-delimited key path.
    #[tracing::instrument(skip(self))]
    pub async fn get_key_autocomplete<A: KeyOwner>(
        &self,
        id: A::Id,
        partial_path: &str,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<KeyCompletion>> {
        let aggregate: A = self.store.replay_object(id, target_version).await?;
        Ok(match aggregate.key_store() {
            Some(keys) => keys.complete(partial_path, range),
            None => Page::empty(),
        })
    }

    /// Returns `(path, value)` pairs of the variables of a structure.
    #[tracing::instrument(skip(self))]
    pub async fn get_structure_variables(
        &self,
        id: StructureIdentifier,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<(String, String)>> {
        let structure: ConfigStructure = self.store.replay_object(id, target_version).await?;
        if !structure.exists() {
            return Ok(Page::empty());
        }
        Ok(structure
            .variables()
            .select(&KeySelection::all(), range)
            .map(|key| (key.path, key.value)))
    }

    /// Returns the layers assigned to an environment, in assignment order.
    #[tracing::instrument(skip(self))]
    pub async fn get_assigned_layers(
        &self,
        id: EnvironmentIdentifier,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<LayerIdentifier>> {
        let environment: ConfigEnvironment = self.store.replay_object(id, target_version).await?;
        if !environment.exists() {
            return Ok(Page::empty());
        }
        Ok(range.apply(environment.layers().iter().cloned()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_available_environments(
        &self,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<EnvironmentIdentifier>> {
        self.list_members::<EnvironmentEvent>(range, target_version)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_available_layers(
        &self,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<LayerIdentifier>> {
        self.list_members::<LayerEvent>(range, target_version).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_available_structures(
        &self,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<StructureIdentifier>> {
        self.list_members::<StructureEvent>(range, target_version)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_available_configurations(
        &self,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<ConfigurationIdentifier>> {
        self.list_members::<ConfigurationEvent>(range, target_version)
            .await
    }

    async fn list_members<E: ListedEvent>(
        &self,
        range: QueryRange,
        target_version: Option<Version>,
    ) -> Result<Page<E::Item>> {
        let list: ObjectList<E> = self.store.replay_list(target_version).await?;
        Ok(range.apply(list.iter().cloned()))
    }
}
