use std::collections::BTreeMap;

use costgraph_config::PricingConfig;
use costgraph_core::{BillingWindow, Clock, HierarchyView, Pod, SystemClock, Target, UnitPrices};
use costgraph_store::GraphStore;

use crate::QueryError;
use crate::builder::{
    cost_hierarchy_query, hierarchy_query, interactions_query, label_filter, label_uids_query,
    live_pods_query,
};
use crate::decode::{PodsRoot, fetch, fetch_hierarchy};
use crate::dedup::dedupe_uids;
use crate::pricing::resolve_prices;
use crate::proration::CostRates;

/// Pod topology and cost lookups against one graph store.
///
/// Every operation is a read. Best-effort views (interactions, hierarchy,
/// cost hierarchy) log failures and come back empty; lookups whose result a
/// caller filters on (label uids, live pods) return the error instead.
pub struct PodQueries<S> {
    store: S,
    pricing: PricingConfig,
    clock: Box<dyn Clock>,
}

impl<S: GraphStore> PodQueries<S> {
    pub fn new(store: S, pricing: PricingConfig) -> Self {
        Self {
            store,
            pricing,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn billing_window(&self) -> BillingWindow {
        BillingWindow::current_month(self.clock.now())
    }

    /// Raw interaction payload, passed through untouched. `None` when the
    /// store call fails.
    pub fn interactions(&self, target: &Target, orphans_only: bool) -> Option<Vec<u8>> {
        let query = interactions_query(target, orphans_only);
        match self.store.query_raw(&query) {
            Ok(raw) => Some(raw),
            Err(err) => {
                tracing::error!(
                    operation = "interactions",
                    pod = %target,
                    orphans_only,
                    error = %err,
                    "failed to retrieve pod interactions"
                );
                None
            }
        }
    }

    pub fn hierarchy(&self, target: &Target) -> HierarchyView {
        let Some(name) = single_pod(target, "hierarchy") else {
            return HierarchyView::default();
        };
        fetch_hierarchy(&self.store, &hierarchy_query(name), "hierarchy", name)
    }

    pub fn cost_hierarchy(&self, target: &Target) -> HierarchyView {
        let Some(name) = single_pod(target, "cost_hierarchy") else {
            return HierarchyView::default();
        };

        let window = self.billing_window();
        let prices = self.resolve_prices(name);
        let rates = CostRates {
            cpu: prices.cpu,
            memory: prices.memory,
            storage: Some(self.pricing.storage_per_gb_hour),
        };
        let query = cost_hierarchy_query(name, window.elapsed_seconds(), rates);

        fetch_hierarchy(&self.store, &query, "cost_hierarchy", name)
    }

    pub fn resolve_prices(&self, name: &str) -> UnitPrices {
        resolve_prices(&self.store, name, &self.pricing)
    }

    pub fn uids_by_labels(
        &self,
        labels: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<String>, QueryError> {
        let Some(filter) = label_filter(labels) else {
            tracing::error!(
                operation = "uids_by_labels",
                "request needs at least one key=value label pair"
            );
            return Err(QueryError::Usage(
                "label filter needs at least one key=value pair".to_owned(),
            ));
        };

        let root: PodsRoot = fetch(&self.store, &label_uids_query(filter)).inspect_err(|err| {
            tracing::error!(
                operation = "uids_by_labels",
                labels = ?labels,
                error = %err,
                "label lookup failed"
            );
        })?;
        Ok(dedupe_uids(&root.pods))
    }

    pub fn live_pods(&self) -> Result<Vec<Pod>, QueryError> {
        let root: PodsRoot = fetch(&self.store, &live_pods_query()).inspect_err(|err| {
            tracing::error!(operation = "live_pods", error = %err, "live pod enumeration failed");
        })?;
        Ok(root.pods)
    }
}

fn single_pod<'a>(target: &'a Target, operation: &str) -> Option<&'a str> {
    let name = target.name();
    if name.is_none() {
        tracing::error!(operation, "request needs a single pod name, got the wildcard target");
    }
    name
}
