use thiserror::Error;

mod dql;
mod graph_dgraph;
mod graph_memory;

pub use dql::{
    BinaryOp, Block, Condition, Edge, Expr, Filter, Query, RootFunc, Selection, SelectionKind,
    VAR_BLOCK, format_number,
};
pub use graph_dgraph::DgraphHttpStore;
pub use graph_memory::{MemoryGraphStore, Uid, format_uid};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] ureq::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("graph store rejected query: {0}")]
    Remote(String),
    #[error("query evaluation failed: {0}")]
    Evaluation(String),
}

pub trait GraphStore {
    /// Runs `query` and returns the `data` object of the response as JSON bytes.
    fn query_raw(&self, query: &Query) -> Result<Vec<u8>, StoreError>;
}

impl<T: GraphStore + ?Sized> GraphStore for &T {
    fn query_raw(&self, query: &Query) -> Result<Vec<u8>, StoreError> {
        (**self).query_raw(query)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for Box<T> {
    fn query_raw(&self, query: &Query) -> Result<Vec<u8>, StoreError> {
        (**self).query_raw(query)
    }
}
