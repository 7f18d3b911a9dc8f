use faresight_core::DurationSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flight time assumed when nothing is known about any route.
pub const DEFAULT_DURATION_MINUTES: u32 = 120;

/// Ordered (origin, destination) city pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: String,
    pub destination: String,
}

impl RouteKey {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            origin: self.destination.clone(),
            destination: self.origin.clone(),
        }
    }
}

/// Static route entry, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub origin: String,
    pub destination: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDuration {
    pub minutes: u32,
    pub source: DurationSource,
}

/// Expected flight time per route, immutable once built.
#[derive(Debug, Clone)]
pub struct DurationTable {
    // origin -> destination -> minutes, so lookups can borrow the query strings
    routes: HashMap<String, HashMap<String, u32>>,
    route_count: usize,
    global_mean: Option<u32>,
    default_minutes: u32,
}

impl Default for DurationTable {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MINUTES)
    }
}

impl DurationTable {
    pub fn new(default_minutes: u32) -> Self {
        Self {
            routes: HashMap::new(),
            route_count: 0,
            global_mean: None,
            default_minutes: default_minutes.max(1),
        }
    }

    /// Build from static entries. Zero-minute entries are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = RouteEntry>, default_minutes: u32) -> Self {
        Self::new(default_minutes).with_entries(entries)
    }

    /// Build from historical (origin, destination, minutes) observations,
    /// keeping the mean per route.
    pub fn from_observations<I>(observations: I, default_minutes: u32) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        let mut sums: HashMap<RouteKey, (f64, u32)> = HashMap::new();
        for (origin, destination, minutes) in observations {
            if !minutes.is_finite() || minutes <= 0.0 {
                tracing::debug!(
                    "Ignoring non-positive duration {} for {} -> {}",
                    minutes,
                    origin,
                    destination
                );
                continue;
            }
            let slot = sums.entry(RouteKey::new(origin, destination)).or_insert((0.0, 0));
            slot.0 += minutes;
            slot.1 += 1;
        }

        let mut table = Self::new(default_minutes);
        for (key, (sum, count)) in sums {
            let mean = (sum / count as f64).round().max(1.0) as u32;
            table.insert(key.origin, key.destination, mean);
        }
        table.recompute_mean();
        table
    }

    /// Overlay static entries, replacing any existing value for the same route.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = RouteEntry>) -> Self {
        for entry in entries {
            if entry.minutes == 0 {
                tracing::warn!(
                    "Skipping zero-minute route entry {} -> {}",
                    entry.origin,
                    entry.destination
                );
                continue;
            }
            self.insert(entry.origin, entry.destination, entry.minutes);
        }
        self.recompute_mean();
        self
    }

    fn insert(&mut self, origin: String, destination: String, minutes: u32) {
        let previous = self
            .routes
            .entry(origin)
            .or_default()
            .insert(destination, minutes);
        if previous.is_none() {
            self.route_count += 1;
        }
    }

    fn recompute_mean(&mut self) {
        if self.route_count == 0 {
            self.global_mean = None;
            return;
        }
        let total: f64 = self
            .routes
            .values()
            .flat_map(|by_destination| by_destination.values())
            .map(|&minutes| minutes as f64)
            .sum();
        self.global_mean = Some((total / self.route_count as f64).round().max(1.0) as u32);
    }

    pub fn get(&self, origin: &str, destination: &str) -> Option<u32> {
        self.routes.get(origin)?.get(destination).copied()
    }

    pub fn len(&self) -> usize {
        self.route_count
    }

    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    pub fn global_mean(&self) -> Option<u32> {
        self.global_mean
    }

    pub fn default_minutes(&self) -> u32 {
        self.default_minutes
    }

    /// Expected duration in minutes. Always positive.
    pub fn resolve(&self, origin: &str, destination: &str) -> u32 {
        self.resolve_detailed(origin, destination).minutes
    }

    /// Exact route, then the return leg, then the mean over all routes,
    /// then the fixed default.
    pub fn resolve_detailed(&self, origin: &str, destination: &str) -> ResolvedDuration {
        if let Some(minutes) = self.get(origin, destination) {
            return ResolvedDuration { minutes, source: DurationSource::Exact };
        }
        if let Some(minutes) = self.get(destination, origin) {
            return ResolvedDuration { minutes, source: DurationSource::Reversed };
        }

        match self.global_mean {
            Some(minutes) => {
                tracing::debug!("No route {} -> {}, using global mean {}", origin, destination, minutes);
                ResolvedDuration { minutes, source: DurationSource::GlobalMean }
            }
            None => ResolvedDuration {
                minutes: self.default_minutes,
                source: DurationSource::Default,
            },
        }
    }
}
