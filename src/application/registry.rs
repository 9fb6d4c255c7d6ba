// Key to behavior lookup tables used by the summary pipeline
use crate::application::health_gateway::{FetchedResponse, GatewayError, HealthGateway};
use crate::domain::metric_id::MetricId;
use crate::domain::metrics::MetricError;
use crate::domain::period::DatePeriod;
use crate::domain::summary::DerivedMetric;
use crate::infrastructure::garmin::dtos::{SchemaValidationError, SeriesKind, TypedSeries};
use crate::infrastructure::garmin::endpoints::Endpoint;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{registry} registry already contains key {key}")]
    Duplicate { registry: &'static str, key: String },

    #[error("{registry} registry has no entry for key {key}")]
    Unregistered { registry: &'static str, key: String },
}

/// One registration per key, populated at startup and read-only afterwards
pub struct Registry<K, V> {
    name: &'static str,
    entries: HashMap<K, V>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: K, value: V) -> Result<(), RegistryError> {
        if self.entries.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                registry: self.name,
                key: format!("{:?}", key),
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn resolve(&self, key: &K) -> Result<&V, RegistryError> {
        self.entries.get(key).ok_or_else(|| RegistryError::Unregistered {
            registry: self.name,
            key: format!("{:?}", key),
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails on the first key without a registration
    pub fn ensure_covers<'a, I>(&self, keys: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for key in keys {
            self.resolve(key)?;
        }
        Ok(())
    }
}

pub type FetchFuture<'a> = BoxFuture<'a, Result<FetchedResponse, GatewayError>>;

/// Fetches one metric's raw payload and reports which endpoint produced it
pub type Fetcher =
    Box<dyn for<'a> Fn(DatePeriod, &'a dyn HealthGateway) -> FetchFuture<'a> + Send + Sync>;

/// Validates a raw payload into its typed series
pub type ResponseToDto = fn(&Value) -> Result<TypedSeries, SchemaValidationError>;

pub type DtoToModel = fn(TypedSeries) -> Result<DerivedMetric, MetricError>;

pub type FetcherRegistry = Registry<MetricId, Fetcher>;
pub type ResponseToDtoRegistry = Registry<Endpoint, ResponseToDto>;
pub type DtoToModelRegistry = Registry<SeriesKind, DtoToModel>;

/// Wraps a closure as a [`Fetcher`], pinning down its higher-ranked signature
pub fn fetcher<F>(f: F) -> Fetcher
where
    F: for<'a> Fn(DatePeriod, &'a dyn HealthGateway) -> FetchFuture<'a> + Send + Sync + 'static,
{
    Box::new(f)
}

/// The registries one pipeline run needs
pub struct PipelineRegistries {
    pub fetchers: FetcherRegistry,
    pub to_dto: ResponseToDtoRegistry,
    pub to_model: DtoToModelRegistry,
}
