use std::collections::BTreeMap;

use costgraph_core::{Target, WorkloadKind};
use costgraph_store::{Block, Edge, Filter, Query, RootFunc, Selection};

use crate::proration::{CostRates, Level, cost_selections};
use crate::schema::{
    CPU_PRICE, END_TIME, INTERACTION_COUNT, LABEL_EDGE, LABEL_KEY, LABEL_VALUE, MEMORY_PRICE,
    NAME, POD_EDGE, TYPE,
};

pub const PODS_BLOCK: &str = "pods";
pub const PARENT_BLOCK: &str = "parent";
pub const PRICE_BLOCK: &str = "pod";
pub const LABELED_PODS_VAR: &str = "podUIDs";

fn marker(kind: WorkloadKind) -> String {
    kind.marker().to_owned()
}

fn name_only() -> Selection {
    Selection::predicate(NAME)
}

/// Pods with their outbound and inbound interaction partners.
///
/// For the wildcard target `orphans_only` picks between pods without any
/// outbound edge and pods with at least one; a named target ignores it.
pub fn interactions_query(target: &Target, orphans_only: bool) -> Query {
    let filter = match target {
        Target::All if orphans_only => Filter::not(Filter::has(POD_EDGE)),
        Target::All => Filter::has(POD_EDGE),
        Target::Named(name) => Filter::eq(NAME, name),
    };

    Query::new().block(
        Block::new(PODS_BLOCK, RootFunc::has(marker(WorkloadKind::Pod)))
            .filter(filter)
            .select(name_only())
            .select(Selection::edge(Edge::forward(POD_EDGE).select(name_only())).alias("outbound"))
            .select(
                Selection::edge(
                    Edge::reverse(POD_EDGE)
                        .filter(Filter::has(marker(WorkloadKind::Pod)))
                        .select(name_only()),
                )
                .alias("inbound"),
            ),
    )
}

fn parent_block(name: &str) -> Block {
    Block::new(PARENT_BLOCK, RootFunc::has(marker(WorkloadKind::Pod)))
        .filter(Filter::eq(NAME, name))
        .select(name_only())
        .select(Selection::predicate(TYPE))
}

fn children_edge() -> Edge {
    Edge::reverse(POD_EDGE)
        .filter(Filter::has(marker(WorkloadKind::Container)))
        .select(name_only())
        .select(Selection::predicate(TYPE))
}

pub fn hierarchy_query(name: &str) -> Query {
    Query::new().block(
        parent_block(name).select(Selection::edge(children_edge()).alias("children")),
    )
}

pub fn cost_hierarchy_query(name: &str, window_seconds: f64, rates: CostRates) -> Query {
    let child_rates = CostRates {
        storage: None,
        ..rates
    };
    let children =
        children_edge().select_all(cost_selections(Level::Child, window_seconds, child_rates));

    Query::new().block(
        parent_block(name)
            .select(Selection::edge(children).alias("children"))
            .select_all(cost_selections(Level::Parent, window_seconds, rates)),
    )
}

pub fn price_lookup_query(name: &str) -> Query {
    Query::new().block(
        Block::new(PRICE_BLOCK, RootFunc::has(marker(WorkloadKind::Pod)))
            .filter(Filter::eq(NAME, name))
            .select(Selection::predicate(CPU_PRICE))
            .select(Selection::predicate(MEMORY_PRICE)),
    )
}

pub fn label_filter(labels: &BTreeMap<String, Vec<String>>) -> Option<Filter> {
    let pairs = labels
        .iter()
        .flat_map(|(key, values)| {
            values.iter().map(move |value| {
                Filter::all([Filter::eq(LABEL_KEY, key), Filter::eq(LABEL_VALUE, value)])
            })
        })
        .collect::<Vec<_>>();

    (!pairs.is_empty()).then(|| Filter::any(pairs))
}

/// Two stages in one request: labels matching `filter` collect their pods
/// into a uid variable, which the second block resolves to uid and name.
pub fn label_uids_query(filter: Filter) -> Query {
    Query::new()
        .block(
            Block::var(RootFunc::has(marker(WorkloadKind::Label)))
                .filter(filter)
                .select(
                    Selection::edge(
                        Edge::reverse(LABEL_EDGE)
                            .filter(Filter::has(marker(WorkloadKind::Pod)))
                            .select(name_only()),
                    )
                    .bind(LABELED_PODS_VAR),
                ),
        )
        .block(
            Block::new(PODS_BLOCK, RootFunc::uid(LABELED_PODS_VAR))
                .select(Selection::uid())
                .select(name_only()),
        )
}

pub fn live_pods_query() -> Query {
    Query::new().block(
        Block::new(PODS_BLOCK, RootFunc::has(marker(WorkloadKind::Pod)))
            .filter(Filter::not(Filter::has(END_TIME)))
            .select(name_only())
            .select(
                Edge::forward(POD_EDGE)
                    .select(name_only())
                    .select(Selection::predicate(INTERACTION_COUNT)),
            )
            .select(
                Selection::edge(
                    Edge::reverse(POD_EDGE)
                        .filter(Filter::has(marker(WorkloadKind::Service)))
                        .select(name_only()),
                )
                .alias("cid"),
            ),
    )
}
