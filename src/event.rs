//! This module defines the per-event storage which the selection reads its
//! inputs from and publishes its outputs to

use crate::{
    electron::{Electron, Vertex},
    error::missing_input,
    numeric::Float,
};

use eyre::Result;
use serde::Deserialize;

use std::collections::BTreeMap;

/// Name of the reconstructed vertex collection
pub const PRIMARY_VERTICES: &str = "PrimaryVertices";

/// Event-wide information
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventInfo {
    /// Event number, for diagnostics
    #[serde(rename = "eventNumber", default)]
    pub event_number: u64,

    /// Generator weight of the event, decorated upstream
    #[serde(rename = "mcEventWeight")]
    pub mc_event_weight: Option<Float>,
}
//
impl EventInfo {
    /// Generator weight of the event, which must have been decorated
    pub fn mc_event_weight(&self) -> Result<Float> {
        self.mc_event_weight.ok_or_else(|| {
            missing_input!(
                "mcEventWeight is not available as decoration of event {}",
                self.event_number
            )
        })
    }
}

/// Subset of an electron collection, referring to the original objects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectronView {
    /// Name of the collection which the view refers to
    pub source: String,

    /// Positions of the selected objects in the source collection
    pub indices: Vec<usize>,
}
//
impl ElectronView {
    /// Create an empty view of some collection
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            indices: Vec::new(),
        }
    }

    /// Number of objects in the view
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Truth that the view is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Access the objects of the view
    pub fn resolve<'store>(&self, store: &'store EventStore) -> Result<Vec<&'store Electron>> {
        let electrons = store.electrons(&self.source)?;
        self.indices
            .iter()
            .map(|&idx| {
                electrons.get(idx).ok_or_else(|| {
                    missing_input!("{} has no electron #{}", self.source, idx)
                })
            })
            .collect()
    }
}

/// Named inputs and outputs of one event
///
/// Upstream stages fill the collections, the selection reads them and
/// decorates the electrons in place, then publishes views and name lists for
/// the downstream stages.
///
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventStore {
    /// Event-wide information
    #[serde(default)]
    pub info: EventInfo,

    /// Vertex collections
    #[serde(default)]
    pub vertices: BTreeMap<String, Vec<Vertex>>,

    /// Electron collections (nominal and systematic variants)
    #[serde(default)]
    pub electrons: BTreeMap<String, Vec<Electron>>,

    /// Lists of names, such as the systematic variants of an upstream stage
    #[serde(default)]
    pub name_lists: BTreeMap<String, Vec<String>>,

    /// Views published by selection stages
    #[serde(skip)]
    pub views: BTreeMap<String, ElectronView>,
}
//
impl EventStore {
    /// Access a vertex collection
    pub fn vertices(&self, name: &str) -> Result<&[Vertex]> {
        self.vertices
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| missing_input!("no {} collection", name))
    }

    /// Hard-scatter primary vertex, i.e. the first vertex of primary type
    pub fn primary_vertex(&self) -> Result<Vertex> {
        self.vertices(PRIMARY_VERTICES)?
            .iter()
            .find(|vx| vx.is_primary())
            .copied()
            .ok_or_else(|| missing_input!("no primary vertex in {}", PRIMARY_VERTICES))
    }

    /// Access an electron collection
    pub fn electrons(&self, name: &str) -> Result<&[Electron]> {
        self.electrons
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| missing_input!("no electron collection named '{}'", name))
    }

    /// Access an electron collection for decoration
    pub fn electrons_mut(&mut self, name: &str) -> Result<&mut [Electron]> {
        self.electrons
            .get_mut(name)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| missing_input!("no electron collection named '{}'", name))
    }

    /// Access a list of names
    pub fn name_list(&self, name: &str) -> Result<&[String]> {
        self.name_lists
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| missing_input!("no name list named '{}'", name))
    }

    /// Publish a view under some name, replacing any previous one
    pub fn record_view(&mut self, name: impl Into<String>, view: ElectronView) {
        self.views.insert(name.into(), view);
    }

    /// Publish a list of names, replacing any previous one
    pub fn record_name_list(&mut self, name: impl Into<String>, list: Vec<String>) {
        self.name_lists.insert(name.into(), list);
    }
}
