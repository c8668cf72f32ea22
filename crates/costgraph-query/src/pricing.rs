use costgraph_config::PricingConfig;
use costgraph_core::UnitPrices;
use costgraph_store::GraphStore;

use crate::builder::price_lookup_query;
use crate::decode::{PriceRoot, fetch};

pub fn default_unit_prices(defaults: &PricingConfig) -> UnitPrices {
    UnitPrices {
        cpu: defaults.cpu_per_core_hour,
        memory: defaults.memory_per_gb_hour,
    }
}

/// CPU and memory prices for the pod named `name`. Each resource falls back
/// to its default on its own when the pod records no override; any lookup
/// failure falls back entirely. Never fails.
pub fn resolve_prices<S>(store: &S, name: &str, defaults: &PricingConfig) -> UnitPrices
where
    S: GraphStore + ?Sized,
{
    let fallback = default_unit_prices(defaults);

    let root: PriceRoot = match fetch(store, &price_lookup_query(name)) {
        Ok(root) => root,
        Err(err) => {
            tracing::warn!(pod = %name, error = %err, "price lookup failed, using default prices");
            return fallback;
        }
    };

    match root.pod.into_iter().next() {
        Some(pod) => UnitPrices {
            cpu: pod.cpu_price.unwrap_or(fallback.cpu),
            memory: pod.memory_price.unwrap_or(fallback.memory),
        },
        None => fallback,
    }
}
