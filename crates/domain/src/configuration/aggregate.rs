//! Prepared configuration aggregate implementation.

use chrono::{DateTime, Utc};
use common::{ConfigurationIdentifier, LayerIdentifier};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::keys::{ConfigKeyAction, KeyStore};

use super::{ConfigurationBuiltData, ConfigurationError, ConfigurationEvent};

/// The compiled, immutable keys of one environment/structure pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedConfiguration {
    identifier: ConfigurationIdentifier,

    #[serde(default)]
    version: Version,

    built: bool,
    keys: KeyStore,
    used_layers: Vec<LayerIdentifier>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
}

impl Aggregate for PreparedConfiguration {
    type Id = ConfigurationIdentifier;
    type Event = ConfigurationEvent;
    type Error = ConfigurationError;

    fn aggregate_type() -> &'static str {
        "PreparedConfiguration"
    }

    fn for_identifier(identifier: ConfigurationIdentifier) -> Self {
        Self {
            identifier,
            version: Version::initial(),
            built: false,
            keys: KeyStore::new(),
            used_layers: Vec::new(),
            valid_from: None,
            valid_to: None,
        }
    }

    fn identifier(&self) -> &ConfigurationIdentifier {
        &self.identifier
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: ConfigurationEvent) {
        match event {
            ConfigurationEvent::ConfigurationBuilt(data) => {
                self.built = true;
                self.keys.import(&data.keys, self.version);
                self.used_layers = data.used_layers;
                self.valid_from = data.valid_from;
                self.valid_to = data.valid_to;
            }
        }
    }
}

// Query methods
impl PreparedConfiguration {
    pub fn exists(&self) -> bool {
        self.built
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn used_layers(&self) -> &[LayerIdentifier] {
        &self.used_layers
    }

    /// Returns true if `at` falls inside the validity window. Open ends are
    /// unbounded.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.built
            && self.valid_from.is_none_or(|from| from <= at)
            && self.valid_to.is_none_or(|to| at <= to)
    }
}

// Command methods (return events)
impl PreparedConfiguration {
    pub fn build(
        &self,
        keys: Vec<ConfigKeyAction>,
        used_layers: Vec<LayerIdentifier>,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ConfigurationEvent>, ConfigurationError> {
        if self.built {
            return Err(ConfigurationError::AlreadyBuilt(self.identifier.clone()));
        }
        if let (Some(from), Some(to)) = (valid_from, valid_to)
            && from > to
        {
            return Err(ConfigurationError::InvalidValidity {
                valid_from: from,
                valid_to: to,
            });
        }

        Ok(vec![ConfigurationEvent::built(ConfigurationBuiltData {
            identifier: self.identifier.clone(),
            keys,
            used_layers,
            valid_from,
            valid_to,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ReplayedEvent;
    use crate::configuration::compile_keys;
    use crate::environment::ConfigEnvironment;
    use crate::layer::EnvironmentLayer;
    use crate::structure::ConfigStructure;
    use chrono::Duration;
    use common::{EnvironmentIdentifier, StructureIdentifier};
    use std::collections::BTreeMap;

    fn replay<A: Aggregate>(aggregate: &mut A, events: Vec<A::Event>) {
        for event in events {
            let next = aggregate.version().next();
            aggregate
                .apply_replayed(ReplayedEvent::new(event, next, Utc::now()))
                .unwrap();
        }
    }

    fn identifier() -> ConfigurationIdentifier {
        ConfigurationIdentifier::new(
            EnvironmentIdentifier::new("Prod", "EU"),
            StructureIdentifier::new("App", 1),
            12,
        )
    }

    #[test]
    fn test_compile_overlay_order() {
        let mut structure = ConfigStructure::for_identifier(StructureIdentifier::new("App", 1));
        let events = structure
            .create(
                BTreeMap::from([
                    ("Db/Host".to_string(), "structure".to_string()),
                    ("Db/Port".to_string(), "5432".to_string()),
                    ("Log".to_string(), "info".to_string()),
                ]),
                BTreeMap::new(),
            )
            .unwrap();
        replay(&mut structure, events);

        let mut base = EnvironmentLayer::for_identifier(LayerIdentifier::new("Base"));
        let events = base.create().unwrap();
        replay(&mut base, events);
        let events = base
            .import_keys(vec![
                ConfigKeyAction::set("db/host", "base"),
                ConfigKeyAction::set("Log", "debug"),
            ])
            .unwrap();
        replay(&mut base, events);

        let mut top = EnvironmentLayer::for_identifier(LayerIdentifier::new("Top"));
        let events = top.create().unwrap();
        replay(&mut top, events);
        let events = top
            .import_keys(vec![ConfigKeyAction::set("Log", "warn")])
            .unwrap();
        replay(&mut top, events);

        let mut env = ConfigEnvironment::for_identifier(EnvironmentIdentifier::new("Prod", "EU"));
        let events = env.create().unwrap();
        replay(&mut env, events);
        let events = env
            .import_keys(vec![ConfigKeyAction::set("DB/PORT", "6543")])
            .unwrap();
        replay(&mut env, events);

        let compiled = compile_keys(&structure, &[base, top], &env);
        let pairs: Vec<(String, String)> = compiled
            .into_iter()
            .filter_map(|action| match action {
                ConfigKeyAction::Set { path, value, .. } => Some((path, value)),
                ConfigKeyAction::Delete { .. } => None,
            })
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("db/host".to_string(), "base".to_string()),
                ("DB/PORT".to_string(), "6543".to_string()),
                ("Log".to_string(), "warn".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_once() {
        let mut config = PreparedConfiguration::for_identifier(identifier());
        let events = config
            .build(vec![ConfigKeyAction::set("A", "1")], vec![], None, None)
            .unwrap();
        replay(&mut config, events);

        assert!(config.exists());
        assert_eq!(config.keys().get("a").unwrap().value, "1");
        assert!(matches!(
            config.build(vec![], vec![], None, None),
            Err(ConfigurationError::AlreadyBuilt(_))
        ));
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let config = PreparedConfiguration::for_identifier(identifier());
        assert!(matches!(
            config.build(vec![], vec![], Some(now), Some(now - Duration::hours(1))),
            Err(ConfigurationError::InvalidValidity { .. })
        ));

        let mut config = config;
        let events = config
            .build(vec![], vec![], Some(now), Some(now + Duration::hours(1)))
            .unwrap();
        replay(&mut config, events);
        assert!(config.is_valid_at(now + Duration::minutes(30)));
        assert!(!config.is_valid_at(now + Duration::hours(2)));
    }
}
