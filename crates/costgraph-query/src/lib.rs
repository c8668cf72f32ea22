use costgraph_store::StoreError;
use thiserror::Error;

mod builder;
mod decode;
mod dedup;
mod pods;
mod pricing;
mod proration;
pub mod schema;

pub use builder::{
    LABELED_PODS_VAR, PARENT_BLOCK, PODS_BLOCK, PRICE_BLOCK, cost_hierarchy_query,
    hierarchy_query, interactions_query, label_filter, label_uids_query, live_pods_query,
    price_lookup_query,
};
pub use decode::decode;
pub use dedup::dedupe_uids;
pub use pods::PodQueries;
pub use pricing::{default_unit_prices, resolve_prices};
pub use proration::{CostRates, Level, cost_selections, duration_selections, duration_var};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid request: {0}")]
    Usage(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
}
