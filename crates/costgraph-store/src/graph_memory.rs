use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use super::{
    BinaryOp, Condition, Edge, Expr, Filter, GraphStore, Query, RootFunc, Selection,
    SelectionKind, StoreError,
};

pub type Uid = u64;

pub fn format_uid(uid: Uid) -> String {
    format!("0x{uid:x}")
}

#[derive(Debug, Default, Clone)]
struct MemoryNode {
    scalars: Map<String, Value>,
    edges: BTreeMap<String, Vec<Uid>>,
}

impl MemoryNode {
    fn has(&self, predicate: &str) -> bool {
        self.scalars
            .get(predicate)
            .is_some_and(|value| !value.is_null())
            || self
                .edges
                .get(predicate)
                .is_some_and(|targets| !targets.is_empty())
    }

    fn count(&self, predicate: &str) -> usize {
        if self.scalars.get(predicate).is_some_and(|value| !value.is_null()) {
            1
        } else {
            self.edges.get(predicate).map_or(0, Vec::len)
        }
    }
}

/// In-process graph that evaluates structured queries directly, the way
/// Dgraph would evaluate their rendered text. Every `math` `since(..)` is
/// measured against the fixed `now` the store was built with.
pub struct MemoryGraphStore {
    nodes: BTreeMap<Uid, MemoryNode>,
    next_uid: Uid,
    now: DateTime<Utc>,
    queries: AtomicUsize,
    failure: Option<String>,
}

impl MemoryGraphStore {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_uid: 1,
            now,
            queries: AtomicUsize::new(0),
            failure: None,
        }
    }

    pub fn insert_node(&mut self, scalars: Value) -> Uid {
        let uid = self.next_uid;
        self.next_uid += 1;

        let scalars = match scalars {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        self.nodes.insert(
            uid,
            MemoryNode {
                scalars,
                edges: BTreeMap::new(),
            },
        );
        uid
    }

    pub fn link(&mut self, from: Uid, predicate: &str, to: Uid) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.edges.entry(predicate.to_owned()).or_default().push(to);
        }
    }

    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn evaluate(&self, query: &Query) -> Result<Value, StoreError> {
        Evaluation {
            store: self,
            uid_vars: HashMap::new(),
        }
        .run(query)
    }

    fn matches(&self, node: &MemoryNode, filter: &Filter) -> bool {
        match filter {
            Filter::Has(predicate) => node.has(predicate),
            Filter::Eq { predicate, value } => node
                .scalars
                .get(predicate)
                .and_then(Value::as_str)
                .is_some_and(|actual| actual == value),
            Filter::Not(inner) => !self.matches(node, inner),
            Filter::And(filters) => filters.iter().all(|filter| self.matches(node, filter)),
            Filter::Or(filters) => filters.iter().any(|filter| self.matches(node, filter)),
        }
    }

    fn neighbours(&self, uid: Uid, node: &MemoryNode, edge: &Edge) -> Vec<Uid> {
        let candidates = if edge.reverse {
            self.nodes
                .iter()
                .filter(|(_, source)| {
                    source
                        .edges
                        .get(&edge.predicate)
                        .is_some_and(|targets| targets.contains(&uid))
                })
                .map(|(source_uid, _)| *source_uid)
                .collect::<Vec<_>>()
        } else {
            node.edges.get(&edge.predicate).cloned().unwrap_or_default()
        };

        candidates
            .into_iter()
            .filter(|candidate| {
                self.nodes.get(candidate).is_some_and(|target| {
                    edge.filter
                        .as_ref()
                        .is_none_or(|filter| self.matches(target, filter))
                })
            })
            .collect()
    }

    fn eval_expr(&self, expr: &Expr, scope: &Scope) -> Result<Option<f64>, StoreError> {
        let value = match expr {
            Expr::Literal(value) => Some(*value),
            Expr::Var(name) => match scope.get(name) {
                Some(Scalar::Number(value)) => Some(*value),
                Some(_) => {
                    return Err(StoreError::Evaluation(format!(
                        "variable {name} is not numeric"
                    )));
                }
                None => None,
            },
            Expr::Since(name) => match scope.get(name) {
                Some(Scalar::Time(at)) => {
                    Some((self.now - *at).num_milliseconds() as f64 / 1000.0)
                }
                Some(_) => {
                    return Err(StoreError::Evaluation(format!(
                        "since() needs a datetime, {name} is not one"
                    )));
                }
                None => None,
            },
            Expr::Binary { op, lhs, rhs } => {
                let Some((lhs, rhs)) = self.eval_pair(lhs, rhs, scope)? else {
                    return Ok(None);
                };
                match op {
                    BinaryOp::Sub => Some(lhs - rhs),
                    BinaryOp::Mul => Some(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => {
                        return Err(StoreError::Evaluation("division by zero".to_owned()));
                    }
                    BinaryOp::Div => Some(lhs / rhs),
                }
            }
            Expr::Min(lhs, rhs) => self
                .eval_pair(lhs, rhs, scope)?
                .map(|(lhs, rhs)| lhs.min(rhs)),
            Expr::Max(lhs, rhs) => self
                .eval_pair(lhs, rhs, scope)?
                .map(|(lhs, rhs)| lhs.max(rhs)),
            Expr::Cond {
                condition,
                then,
                otherwise,
            } => match self.eval_condition(condition, scope)? {
                Some(true) => self.eval_expr(then, scope)?,
                Some(false) => self.eval_expr(otherwise, scope)?,
                None => None,
            },
        };
        Ok(value)
    }

    fn eval_pair(
        &self,
        lhs: &Expr,
        rhs: &Expr,
        scope: &Scope,
    ) -> Result<Option<(f64, f64)>, StoreError> {
        let lhs = self.eval_expr(lhs, scope)?;
        let rhs = self.eval_expr(rhs, scope)?;
        Ok(lhs.zip(rhs))
    }

    fn eval_condition(
        &self,
        condition: &Condition,
        scope: &Scope,
    ) -> Result<Option<bool>, StoreError> {
        let Some((lhs, rhs)) = self.eval_pair(&condition.lhs, &condition.rhs, scope)? else {
            return Ok(None);
        };
        Ok(Some(lhs == rhs))
    }
}

impl GraphStore for MemoryGraphStore {
    fn query_raw(&self, query: &Query) -> Result<Vec<u8>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(StoreError::Remote(message.clone()));
        }

        let data = self.evaluate(query)?;
        Ok(serde_json::to_vec(&data)?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Scalar {
    Number(f64),
    Time(DateTime<Utc>),
    Other,
}

impl Scalar {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(number) => number.as_f64().map_or(Self::Other, Self::Number),
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|at| Self::Time(at.with_timezone(&Utc)))
                .unwrap_or(Self::Other),
            _ => Self::Other,
        }
    }
}

type Scope = HashMap<String, Scalar>;

struct Evaluation<'a> {
    store: &'a MemoryGraphStore,
    uid_vars: HashMap<String, Vec<Uid>>,
}

impl Evaluation<'_> {
    fn run(mut self, query: &Query) -> Result<Value, StoreError> {
        let store = self.store;
        let mut output = Map::new();

        for block in query.blocks() {
            let mut items = Vec::new();
            for uid in self.resolve_root(&block.root)? {
                let Some(node) = store.nodes.get(&uid) else {
                    continue;
                };
                let accepted = block
                    .filter
                    .as_ref()
                    .is_none_or(|filter| store.matches(node, filter));
                if !accepted {
                    continue;
                }

                let object = self.select(uid, node, &block.selections)?;
                if !object.is_empty() {
                    items.push(Value::Object(object));
                }
            }

            if !block.is_var() {
                output.insert(block.name.clone(), Value::Array(items));
            }
        }

        Ok(Value::Object(output))
    }

    fn resolve_root(&self, root: &RootFunc) -> Result<Vec<Uid>, StoreError> {
        match root {
            RootFunc::Has(predicate) => Ok(self
                .store
                .nodes
                .iter()
                .filter(|(_, node)| node.has(predicate))
                .map(|(uid, _)| *uid)
                .collect()),
            RootFunc::Uid(var) => {
                let uids = self
                    .uid_vars
                    .get(var)
                    .ok_or_else(|| StoreError::Evaluation(format!("variable {var} not defined")))?;
                Ok(uids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
            }
        }
    }

    fn select(
        &mut self,
        uid: Uid,
        node: &MemoryNode,
        selections: &[Selection],
    ) -> Result<Map<String, Value>, StoreError> {
        let store = self.store;
        let mut scope = Scope::new();
        let mut object = Map::new();

        for selection in selections {
            let emitted = match &selection.kind {
                SelectionKind::Uid => Some(Value::String(format_uid(uid))),
                SelectionKind::Predicate(predicate) => {
                    let value = node.scalars.get(predicate).filter(|value| !value.is_null());
                    if let (Some(var), Some(value)) = (&selection.var, value) {
                        scope.insert(var.clone(), Scalar::from_value(value));
                    }
                    value.cloned()
                }
                SelectionKind::Count(predicate) => {
                    let count = node.count(predicate);
                    if let Some(var) = &selection.var {
                        scope.insert(var.clone(), Scalar::Number(count as f64));
                    }
                    Some(Value::from(count))
                }
                SelectionKind::Math(expr) => {
                    let value = store.eval_expr(expr, &scope)?;
                    if let (Some(var), Some(value)) = (&selection.var, value) {
                        scope.insert(var.clone(), Scalar::Number(value));
                    }
                    value.and_then(Number::from_f64).map(Value::Number)
                }
                SelectionKind::Edge(edge) => {
                    let targets = store.neighbours(uid, node, edge);
                    if let Some(var) = &selection.var {
                        self.uid_vars
                            .entry(var.clone())
                            .or_default()
                            .extend(targets.iter().copied());
                    }

                    let mut children = Vec::new();
                    for target in targets {
                        let Some(child) = store.nodes.get(&target) else {
                            continue;
                        };
                        let object = self.select(target, child, &edge.selections)?;
                        if !object.is_empty() {
                            children.push(Value::Object(object));
                        }
                    }
                    (!children.is_empty()).then_some(Value::Array(children))
                }
            };

            if let (Some(key), Some(value)) = (selection.output_key(), emitted) {
                object.insert(key, value);
            }
        }

        Ok(object)
    }
}
