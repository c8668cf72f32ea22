use costgraph_core::SECONDS_PER_HOUR;
use costgraph_store::{Condition, Expr, Selection};

use crate::schema::{CPU_REQUEST, END_TIME, MEMORY_REQUEST, START_TIME, STORAGE_REQUEST};

/// Hierarchy level a set of cost variables belongs to. Both levels live in
/// one request, so each gets its own variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Parent,
    Child,
}

impl Level {
    fn var(self, base: &str) -> String {
        match self {
            Self::Parent => base.to_owned(),
            Self::Child => format!("{base}Child"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub cpu: f64,
    pub memory: f64,
    /// `None` leaves storage out of the level entirely.
    pub storage: Option<f64>,
}

pub fn duration_var(level: Level) -> String {
    level.var("durationInHours")
}

/// Binds `durationInHours` for every node at `level`.
///
/// The store evaluates, per node and with `W` the seconds elapsed in the
/// billing window:
///
/// ```text
/// secondsSinceStart = min(since(startTime), W)
/// isTerminated      = count(endTime)
/// secondsSinceEnd   = isTerminated == 0 ? 0 : since(endTime)
/// durationInHours   = max((secondsSinceStart - secondsSinceEnd) / 3600, 0)
/// ```
pub fn duration_selections(level: Level, window_seconds: f64) -> Vec<Selection> {
    let start = level.var("st");
    let start_seconds = level.var("stSeconds");
    let since_start = level.var("secondsSinceStart");
    let end = level.var("et");
    let terminated = level.var("isTerminated");
    let since_end = level.var("secondsSinceEnd");

    vec![
        Selection::predicate(START_TIME).bind(&start),
        Selection::math(Expr::since(&start)).bind(&start_seconds),
        Selection::math(Expr::min(Expr::var(&start_seconds), Expr::lit(window_seconds)))
            .bind(&since_start),
        Selection::predicate(END_TIME).bind(&end),
        Selection::count(END_TIME).bind(&terminated),
        Selection::math(Expr::cond(
            Condition::eq(Expr::var(&terminated), Expr::lit(0.0)),
            Expr::lit(0.0),
            Expr::since(&end),
        ))
        .bind(&since_end),
        Selection::math(Expr::max(
            (Expr::var(&since_start) - Expr::var(&since_end)) / Expr::lit(SECONDS_PER_HOUR),
            Expr::lit(0.0),
        ))
        .bind(duration_var(level)),
    ]
}

pub fn cost_selections(level: Level, window_seconds: f64, rates: CostRates) -> Vec<Selection> {
    let cpu = level.var("cpu");
    let memory = level.var("memory");
    let storage = level.var("storage");
    let hours = duration_var(level);

    let mut selections = vec![
        Selection::predicate(CPU_REQUEST).alias("cpu").bind(&cpu),
        Selection::predicate(MEMORY_REQUEST)
            .alias("memory")
            .bind(&memory),
    ];
    if rates.storage.is_some() {
        selections.push(
            Selection::predicate(STORAGE_REQUEST)
                .alias("storage")
                .bind(&storage),
        );
    }

    selections.extend(duration_selections(level, window_seconds));

    selections.push(
        Selection::math(Expr::var(&cpu) * Expr::var(&hours) * Expr::lit(rates.cpu))
            .alias("cpuCost"),
    );
    selections.push(
        Selection::math(Expr::var(&memory) * Expr::var(&hours) * Expr::lit(rates.memory))
            .alias("memoryCost"),
    );
    if let Some(price) = rates.storage {
        selections.push(
            Selection::math(Expr::var(&storage) * Expr::var(&hours) * Expr::lit(price))
                .alias("storageCost"),
        );
    }

    selections
}
