//! Predicate names shared with the ingestion side of the graph.

pub const NAME: &str = "name";
pub const TYPE: &str = "type";
pub const START_TIME: &str = "startTime";
pub const END_TIME: &str = "endTime";
pub const CPU_REQUEST: &str = "cpuRequest";
pub const MEMORY_REQUEST: &str = "memoryRequest";
pub const STORAGE_REQUEST: &str = "storageRequest";
pub const CPU_PRICE: &str = "cpuPrice";
pub const MEMORY_PRICE: &str = "memoryPrice";
pub const INTERACTION_COUNT: &str = "count";
pub const LABEL_KEY: &str = "key";
pub const LABEL_VALUE: &str = "value";

/// Container→pod ownership, pod→pod interaction and service→pod selection
/// all share this edge; the far end's marker tells them apart.
pub const POD_EDGE: &str = "pod";
pub const LABEL_EDGE: &str = "label";
