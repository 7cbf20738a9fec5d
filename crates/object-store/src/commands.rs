//! Write-side operations on the configuration aggregates.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{
    ConfigurationIdentifier, EnvironmentIdentifier, LayerIdentifier, StructureIdentifier,
};
use domain::{
    Aggregate, ConfigEnvironment, ConfigKeyAction, ConfigStructure, ConfigurationError,
    DomainError, EnvironmentError, EnvironmentLayer, LayerList, PreparedConfiguration, Recorder,
    compile_keys,
};
use event_store::Version;

use crate::error::{ObjectStoreError, Result};
use crate::store::DomainObjectStore;

/// Loads the latest aggregate, runs one command on it and appends the
/// resulting events.
///
/// Every operation returns the version of the object after the write. A
/// command that produces no events leaves the log untouched and returns
/// the current version. Conflicting writes fail with
/// [`ObjectStoreError::ConcurrencyConflict`] and are not retried.
#[derive(Clone)]
pub struct CommandService {
    store: Arc<DomainObjectStore>,
}

impl CommandService {
    pub fn new(store: Arc<DomainObjectStore>) -> Self {
        Self { store }
    }

    async fn execute<A, F>(&self, id: A::Id, command: F) -> Result<Version>
    where
        A: Aggregate,
        F: FnOnce(&A) -> std::result::Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate: A = self.store.replay_object(id, None).await?;
        let mut recorder = Recorder::new(aggregate);
        recorder
            .record(command)
            .map_err(|err| ObjectStoreError::from(DomainError::from(err)))?;

        let version = recorder
            .write_recorded_events(self.store.event_store().as_ref())
            .await?;
        self.store.cache().insert(recorder.aggregate());
        Ok(version)
    }

    // Environments

    #[tracing::instrument(skip(self))]
    pub async fn create_environment(&self, id: EnvironmentIdentifier) -> Result<Version> {
        self.execute(id, ConfigEnvironment::create).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_default_environment(&self, id: EnvironmentIdentifier) -> Result<Version> {
        self.execute(id, ConfigEnvironment::create_default).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_environment(&self, id: EnvironmentIdentifier) -> Result<Version> {
        self.execute(id, ConfigEnvironment::delete).await
    }

    /// Replaces the layers of an environment. Every layer must exist.
    #[tracing::instrument(skip(self))]
    pub async fn assign_layers(
        &self,
        id: EnvironmentIdentifier,
        layers: Vec<LayerIdentifier>,
    ) -> Result<Version> {
        let existing: LayerList = self.store.replay_list(None).await?;
        if let Some(unknown) = layers.iter().find(|layer| !existing.contains(layer)) {
            return Err(DomainError::from(EnvironmentError::UnknownLayer(unknown.clone())).into());
        }
        self.execute(id, |env: &ConfigEnvironment| env.assign_layers(layers))
            .await
    }

    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn import_environment_keys(
        &self,
        id: EnvironmentIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Version> {
        self.execute(id, |env: &ConfigEnvironment| env.import_keys(actions))
            .await
    }

    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn modify_environment_keys(
        &self,
        id: EnvironmentIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Version> {
        self.execute(id, |env: &ConfigEnvironment| env.modify_keys(actions))
            .await
    }

    // Layers

    #[tracing::instrument(skip(self))]
    pub async fn create_layer(&self, id: LayerIdentifier) -> Result<Version> {
        self.execute(id, EnvironmentLayer::create).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_layer(&self, id: LayerIdentifier) -> Result<Version> {
        self.execute(id, EnvironmentLayer::delete).await
    }

    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn import_layer_keys(
        &self,
        id: LayerIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Version> {
        self.execute(id, |layer: &EnvironmentLayer| layer.import_keys(actions))
            .await
    }

    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn modify_layer_keys(
        &self,
        id: LayerIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Version> {
        self.execute(id, |layer: &EnvironmentLayer| layer.modify_keys(actions))
            .await
    }

    // Structures

    #[tracing::instrument(skip(self, keys, variables))]
    pub async fn create_structure(
        &self,
        id: StructureIdentifier,
        keys: BTreeMap<String, String>,
        variables: BTreeMap<String, String>,
    ) -> Result<Version> {
        self.execute(id, |structure: &ConfigStructure| {
            structure.create(keys, variables)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_structure(&self, id: StructureIdentifier) -> Result<Version> {
        self.execute(id, ConfigStructure::delete).await
    }

    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn modify_structure_variables(
        &self,
        id: StructureIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Version> {
        self.execute(id, |structure: &ConfigStructure| {
            structure.modify_variables(actions)
        })
        .await
    }

    // Configurations

    /// Compiles and records the configuration of `environment` for
    /// `structure` as of the current head of the log.
    ///
    /// Structure keys are overlaid by the keys of the assigned layers in
    /// assignment order and then by the environment's own keys. Returns the
    /// identifier of the new configuration and its version.
    #[tracing::instrument(skip(self))]
    pub async fn build_configuration(
        &self,
        environment: EnvironmentIdentifier,
        structure: StructureIdentifier,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Result<(ConfigurationIdentifier, Version)> {
        let head = self.store.event_store().head_position().await?;

        let env: ConfigEnvironment = self
            .store
            .replay_object(environment.clone(), Some(head))
            .await?;
        if !env.exists() {
            return Err(
                DomainError::from(ConfigurationError::EnvironmentNotFound(environment)).into(),
            );
        }

        let compiled_structure: ConfigStructure = self
            .store
            .replay_object(structure.clone(), Some(head))
            .await?;
        if !compiled_structure.exists() {
            return Err(DomainError::from(ConfigurationError::StructureNotFound(structure)).into());
        }

        let mut layers = Vec::with_capacity(env.layers().len());
        for layer_id in env.layers() {
            let layer: EnvironmentLayer = self
                .store
                .replay_object(layer_id.clone(), Some(head))
                .await?;
            if layer.exists() {
                layers.push(layer);
            }
        }

        let keys = compile_keys(&compiled_structure, &layers, &env);
        let used_layers: Vec<LayerIdentifier> =
            layers.iter().map(|layer| layer.identifier().clone()).collect();

        let id = ConfigurationIdentifier::new(environment, structure, head.as_i64());
        tracing::info!(
            configuration = ?id,
            keys = keys.len(),
            layers = used_layers.len(),
            "building configuration"
        );

        let version = self
            .execute(id.clone(), |configuration: &PreparedConfiguration| {
                configuration.build(keys, used_layers, valid_from, valid_to)
            })
            .await?;
        Ok((id, version))
    }
}
