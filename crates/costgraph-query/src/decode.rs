use costgraph_core::{HierarchyNode, HierarchyView, Pod};
use costgraph_store::{GraphStore, Query};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::QueryError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PodsRoot {
    #[serde(default)]
    pub pods: Vec<Pod>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PriceRoot {
    #[serde(default)]
    pub pod: Vec<Pod>,
}

#[derive(Debug, Default, Deserialize)]
struct ParentRoot {
    #[serde(default)]
    parent: Vec<HierarchyNode>,
}

pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, QueryError> {
    Ok(serde_json::from_slice(raw)?)
}

pub(crate) fn fetch<T, S>(store: &S, query: &Query) -> Result<T, QueryError>
where
    T: DeserializeOwned,
    S: GraphStore + ?Sized,
{
    let raw = store.query_raw(query)?;
    decode(&raw)
}

pub(crate) fn fetch_hierarchy<S>(
    store: &S,
    query: &Query,
    operation: &str,
    name: &str,
) -> HierarchyView
where
    S: GraphStore + ?Sized,
{
    match fetch::<ParentRoot, _>(store, query) {
        Ok(root) => match root.parent.into_iter().next() {
            Some(data) => HierarchyView { data },
            None => {
                tracing::warn!(operation, pod = %name, "no pod found for hierarchy request");
                HierarchyView::default()
            }
        },
        Err(err) => {
            tracing::error!(operation, pod = %name, error = %err, "hierarchy request failed");
            HierarchyView::default()
        }
    }
}
