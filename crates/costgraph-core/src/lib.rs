use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod billing;

pub use billing::{
    BillingWindow, Clock, FixedClock, SECONDS_PER_HOUR, SystemClock, month_start, seconds_between,
};

pub const ALL_TARGET: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    All,
    Named(String),
}

impl Target {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_TARGET {
            Self::All
        } else {
            Self::Named(value.to_owned())
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(name) => Some(name.as_str()),
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_TARGET),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Pod,
    Container,
    Service,
    Label,
}

impl WorkloadKind {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Pod => "isPod",
            Self::Container => "isContainer",
            Self::Service => "isService",
            Self::Label => "isLabel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPrices {
    pub cpu: f64,
    pub memory: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "startTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "cpuPrice", default, skip_serializing_if = "Option::is_none")]
    pub cpu_price: Option<f64>,
    #[serde(
        rename = "memoryPrice",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_price: Option<f64>,
    #[serde(rename = "pod", default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<PodInteraction>,
    #[serde(rename = "cid", default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceRef>,
}

impl Pod {
    pub fn is_live(&self) -> bool {
        self.end_time.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PodInteraction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchyView {
    pub data: HierarchyNode,
}

impl HierarchyView {
    pub fn is_empty(&self) -> bool {
        self.data.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cpu: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub memory: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub storage: f64,
    #[serde(rename = "cpuCost", default, skip_serializing_if = "is_zero")]
    pub cpu_cost: f64,
    #[serde(rename = "memoryCost", default, skip_serializing_if = "is_zero")]
    pub memory_cost: f64,
    #[serde(rename = "storageCost", default, skip_serializing_if = "is_zero")]
    pub storage_cost: f64,
}

impl HierarchyNode {
    pub fn total_cost(&self) -> f64 {
        self.cpu_cost + self.memory_cost + self.storage_cost
    }
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}
