//! Aggregates enumerating every live object of one kind.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;

use common::{Identifier, ListScope};
use event_store::{EventQuery, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};

/// Effect of an event on a list of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange<I> {
    Added(I),
    Removed(I),
}

/// Events that create or delete the objects a list tracks.
pub trait ListedEvent: DomainEvent + 'static {
    /// Identifier of a listed object.
    type Item: Identifier + Ord;

    /// Aggregate type of the listed objects.
    const SOURCE_TYPE: &'static str;

    /// Aggregate type of the list itself.
    const LIST_TYPE: &'static str;

    /// Event types that change membership.
    const EVENT_TYPES: &'static [&'static str];

    fn list_change(self) -> Option<ListChange<Self::Item>>;
}

/// The set of live identifiers of one aggregate kind.
///
/// Lists read only the creation and deletion events of their kind, so their
/// version is the position of the last such event.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ObjectList<E: ListedEvent> {
    #[serde(skip)]
    scope: ListScope,
    #[serde(default)]
    version: Version,
    items: BTreeSet<E::Item>,
}

impl<E: ListedEvent> ObjectList<E> {
    pub fn contains(&self, item: &E::Item) -> bool {
        self.items.contains(item)
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &E::Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: ListedEvent> Default for ObjectList<E> {
    fn default() -> Self {
        Self {
            scope: ListScope,
            version: Version::initial(),
            items: BTreeSet::new(),
        }
    }
}

impl<E: ListedEvent> Clone for ObjectList<E> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope,
            version: self.version,
            items: self.items.clone(),
        }
    }
}

impl<E: ListedEvent> fmt::Debug for ObjectList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(E::LIST_TYPE)
            .field("version", &self.version)
            .field("items", &self.items)
            .finish()
    }
}

impl<E: ListedEvent> PartialEq for ObjectList<E> {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.items == other.items
    }
}

impl<E: ListedEvent> Aggregate for ObjectList<E> {
    type Id = ListScope;
    type Event = E;
    type Error = Infallible;

    fn aggregate_type() -> &'static str {
        E::LIST_TYPE
    }

    fn for_identifier(_id: ListScope) -> Self {
        Self::default()
    }

    fn identifier(&self) -> &ListScope {
        &self.scope
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: E) {
        match event.list_change() {
            Some(ListChange::Added(item)) => {
                self.items.insert(item);
            }
            Some(ListChange::Removed(item)) => {
                self.items.remove(&item);
            }
            None => {}
        }
    }

    fn event_query(_id: &ListScope) -> EventQuery {
        EventQuery::new()
            .aggregate_type(E::SOURCE_TYPE)
            .event_types(E::EVENT_TYPES.iter().copied())
    }
}
