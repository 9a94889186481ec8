//! Filter, group-by, order-by and limit over named columns of nullable values.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;

use crate::{
    data::{ComparableValue, Value, display_cell},
    filter::{FilterCondition, evaluate_condition},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            anyhow!(
                "Column '{name}' not found (available: {})",
                self.columns.join(", ")
            )
        })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    /// Keeps rows matching every condition.
    pub fn filter(self, conditions: &[FilterCondition]) -> Result<Self> {
        if conditions.is_empty() {
            return Ok(self);
        }
        let bound = conditions
            .iter()
            .map(|c| Ok((self.require_column(&c.column)?, c)))
            .collect::<Result<Vec<_>>>()?;
        let keep = self
            .rows
            .par_iter()
            .map(|row| {
                for (idx, condition) in &bound {
                    if !evaluate_condition(condition, row[*idx].as_ref())? {
                        return Ok(false);
                    }
                }
                Ok(true)
            })
            .collect::<Result<Vec<bool>>>()?;
        let rows = self
            .rows
            .into_iter()
            .zip(keep)
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect();
        Ok(Self {
            columns: self.columns,
            rows,
        })
    }

    /// Projects the named columns in the given order.
    pub fn select(self, columns: &[String]) -> Result<Self> {
        if columns.is_empty() {
            return Ok(self);
        }
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|idx| row[*idx].clone()).collect())
            .collect();
        Ok(Self {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// One output row per distinct key, key columns first, then one column
    /// per aggregation. Output is ordered by key.
    pub fn group_by(&self, keys: &[String], aggregations: &[Aggregation]) -> Result<Frame> {
        let key_indices = keys
            .iter()
            .map(|k| self.require_column(k))
            .collect::<Result<Vec<_>>>()?;
        let agg_indices = aggregations
            .iter()
            .map(|agg| match &agg.column {
                Some(column) => self
                    .require_column(column)
                    .map(Some)
                    .with_context(|| format!("Aggregation '{}'", agg.alias)),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        let fresh = || -> Vec<Accumulator> {
            aggregations
                .iter()
                .map(|agg| Accumulator::new(&agg.reducer))
                .collect()
        };

        let groups: BTreeMap<Vec<ComparableValue>, Vec<Accumulator>> = self
            .rows
            .par_iter()
            .fold(BTreeMap::new, |mut groups, row| {
                let key = key_indices
                    .iter()
                    .map(|idx| ComparableValue(row[*idx].clone()))
                    .collect::<Vec<_>>();
                let accumulators = groups.entry(key).or_insert_with(fresh);
                for (acc, idx) in accumulators.iter_mut().zip(&agg_indices) {
                    acc.ingest(idx.map(|i| row[i].as_ref()));
                }
                groups
            })
            .reduce(BTreeMap::new, merge_groups);

        // A global aggregate over an empty frame still yields one row.
        let groups = if groups.is_empty() && key_indices.is_empty() {
            BTreeMap::from([(Vec::new(), fresh())])
        } else {
            groups
        };

        let mut columns = keys.to_vec();
        columns.extend(aggregations.iter().map(|agg| agg.alias.clone()));
        let rows = groups
            .into_iter()
            .map(|(key, accumulators)| {
                key.into_iter()
                    .map(|k| k.0)
                    .chain(accumulators.into_iter().map(Accumulator::finish))
                    .collect()
            })
            .collect();
        Ok(Frame { columns, rows })
    }

    /// Stable multi-key sort; nulls come first ascending and last descending.
    pub fn order_by(mut self, sorts: &[SortDirective]) -> Result<Self> {
        if sorts.is_empty() {
            return Ok(self);
        }
        let instructions = sorts
            .iter()
            .map(|s| Ok((self.require_column(&s.column)?, s.ascending)))
            .collect::<Result<Vec<_>>>()?;
        self.rows.par_sort_by(|left, right| {
            for (idx, ascending) in &instructions {
                let ordering = compare_cells(left[*idx].as_ref(), right[*idx].as_ref());
                let ordering = if *ascending {
                    ordering
                } else {
                    ordering.reverse()
                };
                if !ordering.is_eq() {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
        Ok(self)
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            self.rows.truncate(limit);
        }
        self
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| display_cell(cell.as_ref())).collect())
            .collect()
    }
}

fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> std::cmp::Ordering {
    match (left, right) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(l), Some(r)) => l.cmp(r),
    }
}

fn merge_groups(
    mut left: BTreeMap<Vec<ComparableValue>, Vec<Accumulator>>,
    right: BTreeMap<Vec<ComparableValue>, Vec<Accumulator>>,
) -> BTreeMap<Vec<ComparableValue>, Vec<Accumulator>> {
    for (key, accumulators) in right {
        match left.get_mut(&key) {
            Some(existing) => {
                for (acc, other) in existing.iter_mut().zip(accumulators) {
                    acc.merge(other);
                }
            }
            None => {
                left.insert(key, accumulators);
            }
        }
    }
    left
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reducer {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    CountTrue,
    Percentile(f64),
}

impl Reducer {
    pub fn parse(token: &str) -> Result<Self> {
        let lowered = token.trim().to_ascii_lowercase();
        let reducer = match lowered.as_str() {
            "count" => Reducer::Count,
            "count_distinct" | "distinct" => Reducer::CountDistinct,
            "sum" => Reducer::Sum,
            "avg" | "mean" => Reducer::Avg,
            "min" => Reducer::Min,
            "max" => Reducer::Max,
            "count_true" => Reducer::CountTrue,
            "median" => Reducer::Percentile(0.5),
            other => {
                let Some(digits) = other.strip_prefix('p') else {
                    bail!("Unknown reducer '{token}'");
                };
                let percent: f64 = digits
                    .parse()
                    .with_context(|| format!("Unknown reducer '{token}'"))?;
                if !(0.0..=100.0).contains(&percent) {
                    bail!("Percentile '{token}' must be between p0 and p100");
                }
                Reducer::Percentile(percent / 100.0)
            }
        };
        Ok(reducer)
    }

    fn label(&self) -> String {
        match self {
            Reducer::Count => "count".into(),
            Reducer::CountDistinct => "count_distinct".into(),
            Reducer::Sum => "sum".into(),
            Reducer::Avg => "avg".into(),
            Reducer::Min => "min".into(),
            Reducer::Max => "max".into(),
            Reducer::CountTrue => "count_true".into(),
            Reducer::Percentile(p) => {
                let percent = p * 100.0;
                if (percent - percent.round()).abs() < 1e-9 {
                    format!("p{}", percent.round() as i64)
                } else {
                    format!("p{percent}")
                }
            }
        }
    }
}

/// `reducer[:column[:alias]]`, e.g. `count`, `sum:positive`,
/// `count_distinct:entity_id:nb_games`, `p50:price_major`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub reducer: Reducer,
    pub column: Option<String>,
    pub alias: String,
}

impl Aggregation {
    pub fn new(reducer: Reducer, column: Option<&str>) -> Self {
        let alias = match column {
            Some(column) => format!("{}_{column}", reducer.label()),
            None => reducer.label(),
        };
        Self {
            reducer,
            column: column.map(str::to_string),
            alias,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':').map(str::trim);
        let reducer = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Aggregation is missing a reducer"))?;
        let reducer = Reducer::parse(reducer)?;
        let column = parts.next().filter(|s| !s.is_empty());
        if column.is_none() && reducer != Reducer::Count {
            bail!("Aggregation '{spec}' needs a column");
        }
        let mut aggregation = Aggregation::new(reducer, column);
        if let Some(alias) = parts.next().filter(|s| !s.is_empty()) {
            aggregation = aggregation.with_alias(alias);
        }
        if parts.next().is_some() {
            bail!("Aggregation '{spec}' has too many ':' separated parts");
        }
        Ok(aggregation)
    }
}

pub fn parse_aggregations(specs: &[String]) -> Result<Vec<Aggregation>> {
    specs.iter().map(|s| Aggregation::parse(s)).collect()
}

/// Exact numeric sum: integers in `i128`, floats summed in sorted order at
/// the end so that merge order never changes the result.
#[derive(Debug, Clone, Default)]
pub struct NumericSum {
    integers: i128,
    floats: Vec<f64>,
    count: usize,
}

impl NumericSum {
    fn add(&mut self, value: &Value) {
        match value {
            Value::Integer(i) => {
                self.integers += i128::from(*i);
                self.count += 1;
            }
            Value::Float(f) => {
                self.floats.push(*f);
                self.count += 1;
            }
            _ => {}
        }
    }

    fn merge(&mut self, other: NumericSum) {
        self.integers += other.integers;
        self.floats.extend(other.floats);
        self.count += other.count;
    }

    fn total(&mut self) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        if self.floats.is_empty() {
            return Some(match i64::try_from(self.integers) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Float(self.integers as f64),
            });
        }
        Some(Value::Float(self.float_total()))
    }

    fn float_total(&mut self) -> f64 {
        self.floats.sort_by(f64::total_cmp);
        self.floats.iter().sum::<f64>() + self.integers as f64
    }
}

/// Partial state of one reducer.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Count(usize),
    CountDistinct(BTreeSet<Value>),
    Sum(NumericSum),
    Avg(NumericSum),
    Min(Option<Value>),
    Max(Option<Value>),
    CountTrue(usize),
    Percentile { fraction: f64, values: Vec<f64> },
}

impl Accumulator {
    pub fn new(reducer: &Reducer) -> Self {
        match reducer {
            Reducer::Count => Accumulator::Count(0),
            Reducer::CountDistinct => Accumulator::CountDistinct(BTreeSet::new()),
            Reducer::Sum => Accumulator::Sum(NumericSum::default()),
            Reducer::Avg => Accumulator::Avg(NumericSum::default()),
            Reducer::Min => Accumulator::Min(None),
            Reducer::Max => Accumulator::Max(None),
            Reducer::CountTrue => Accumulator::CountTrue(0),
            Reducer::Percentile(fraction) => Accumulator::Percentile {
                fraction: *fraction,
                values: Vec::new(),
            },
        }
    }

    /// `cell` is `None` for column-less reducers (`count`) and
    /// `Some(None)` for a null cell.
    pub fn ingest(&mut self, cell: Option<Option<&Value>>) {
        match (self, cell) {
            (Accumulator::Count(n), None) => *n += 1,
            (Accumulator::Count(n), Some(Some(_))) => *n += 1,
            (Accumulator::Count(_), Some(None)) => {}
            (_, None) | (_, Some(None)) => {}
            (Accumulator::CountDistinct(set), Some(Some(value))) => {
                set.insert(value.clone());
            }
            (Accumulator::Sum(state), Some(Some(value)))
            | (Accumulator::Avg(state), Some(Some(value))) => state.add(value),
            (Accumulator::Min(current), Some(Some(value))) => {
                if current.as_ref().is_none_or(|c| value < c) {
                    *current = Some(value.clone());
                }
            }
            (Accumulator::Max(current), Some(Some(value))) => {
                if current.as_ref().is_none_or(|c| value > c) {
                    *current = Some(value.clone());
                }
            }
            (Accumulator::CountTrue(n), Some(Some(value))) => {
                if matches!(value, Value::Boolean(true)) {
                    *n += 1;
                }
            }
            (Accumulator::Percentile { values, .. }, Some(Some(value))) => {
                if let Some(f) = value.as_f64() {
                    values.push(f);
                }
            }
        }
    }

    pub fn merge(&mut self, other: Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b))
            | (Accumulator::CountTrue(a), Accumulator::CountTrue(b)) => *a += b,
            (Accumulator::CountDistinct(a), Accumulator::CountDistinct(b)) => a.extend(b),
            (Accumulator::Sum(a), Accumulator::Sum(b))
            | (Accumulator::Avg(a), Accumulator::Avg(b)) => a.merge(b),
            (Accumulator::Min(a), Accumulator::Min(b)) => {
                if let Some(b) = b
                    && a.as_ref().is_none_or(|current| &b < current)
                {
                    *a = Some(b);
                }
            }
            (Accumulator::Max(a), Accumulator::Max(b)) => {
                if let Some(b) = b
                    && a.as_ref().is_none_or(|current| &b > current)
                {
                    *a = Some(b);
                }
            }
            (Accumulator::Percentile { values: a, .. }, Accumulator::Percentile { values: b, .. }) => {
                a.extend(b)
            }
            (left, right) => {
                log::warn!("Ignoring merge of mismatched accumulators {left:?} and {right:?}")
            }
        }
    }

    pub fn finish(self) -> Option<Value> {
        match self {
            Accumulator::Count(n) | Accumulator::CountTrue(n) => Some(Value::Integer(n as i64)),
            Accumulator::CountDistinct(set) => Some(Value::Integer(set.len() as i64)),
            Accumulator::Sum(mut state) => state.total(),
            Accumulator::Avg(mut state) => {
                if state.count == 0 {
                    None
                } else {
                    let count = state.count as f64;
                    Some(Value::Float(state.float_total() / count))
                }
            }
            Accumulator::Min(value) | Accumulator::Max(value) => value,
            Accumulator::Percentile { fraction, values } => {
                percentile(values, fraction).map(Value::Float)
            }
        }
    }
}

/// Linear interpolation between closest ranks over `fraction * (n - 1)`.
pub fn percentile(mut values: Vec<f64>, fraction: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let position = fraction.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub column: String,
    pub ascending: bool,
}

impl SortDirective {
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':');
        let column = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Sort directive is missing a column"))?;
        let direction = parts.next().unwrap_or("asc");
        let ascending = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => true,
            "desc" => false,
            other => {
                return Err(anyhow!("Unknown sort direction '{other}'"));
            }
        };
        Ok(SortDirective {
            column: column.to_string(),
            ascending,
        })
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

pub fn parse_sort_directives(specs: &[String]) -> Result<Vec<SortDirective>> {
    specs
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SortDirective::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let row = |genre: &str, id: &str, positive: Option<i64>, mac: bool| {
            vec![
                Some(Value::String(genre.into())),
                Some(Value::String(id.into())),
                positive.map(Value::Integer),
                Some(Value::Boolean(mac)),
            ]
        };
        Frame::new(
            vec!["category".into(), "entity_id".into(), "positive".into(), "platform_mac".into()],
            vec![
                row("Action", "1", Some(10), true),
                row("Action", "2", Some(30), false),
                row("Action", "2", Some(30), false),
                row("RPG", "3", None, true),
            ],
        )
    }

    #[test]
    fn group_by_with_commutative_reducers() {
        let aggs = parse_aggregations(&[
            "count_distinct:entity_id:nb_games".into(),
            "sum:positive".into(),
            "count_true:platform_mac:nb_mac".into(),
            "count".into(),
        ])
        .unwrap();
        let grouped = sample().group_by(&["category".into()], &aggs).unwrap();
        assert_eq!(
            grouped.columns(),
            ["category", "nb_games", "sum_positive", "nb_mac", "count"]
        );
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.value(0, "nb_games"), Some(&Value::Integer(2)));
        assert_eq!(grouped.value(0, "sum_positive"), Some(&Value::Integer(70)));
        assert_eq!(grouped.value(0, "nb_mac"), Some(&Value::Integer(1)));
        assert_eq!(grouped.value(1, "sum_positive"), None);
        assert_eq!(grouped.value(1, "count"), Some(&Value::Integer(1)));
    }

    #[test]
    fn signed_zero_keys_share_a_group() {
        let frame = Frame::new(
            vec!["discount".into()],
            vec![
                vec![Some(Value::Float(0.0))],
                vec![Some(Value::Float(-0.0))],
                vec![Some(Value::Float(10.0))],
            ],
        );
        let grouped = frame
            .group_by(&["discount".into()], &[Aggregation::parse("count").unwrap()])
            .unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.value(0, "count"), Some(&Value::Integer(2)));
    }

    #[test]
    fn merge_matches_single_pass() {
        let values = [Value::Float(0.1), Value::Float(0.2), Value::Float(0.3), Value::Integer(4)];
        let mut single = Accumulator::new(&Reducer::Sum);
        for v in &values {
            single.ingest(Some(Some(v)));
        }
        let mut left = Accumulator::new(&Reducer::Sum);
        let mut right = Accumulator::new(&Reducer::Sum);
        right.ingest(Some(Some(&values[2])));
        right.ingest(Some(Some(&values[0])));
        left.ingest(Some(Some(&values[3])));
        left.ingest(Some(Some(&values[1])));
        right.merge(left);
        assert_eq!(single.finish(), right.finish());
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(vec![1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
        assert_eq!(percentile(vec![5.0], 0.9), Some(5.0));
        assert_eq!(percentile(Vec::new(), 0.5), None);
    }

    #[test]
    fn global_aggregate_over_empty_frame() {
        let empty = Frame::new(vec!["price".into()], Vec::new());
        let grouped = empty
            .group_by(&[], &[Aggregation::parse("count").unwrap(), Aggregation::parse("avg:price").unwrap()])
            .unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.value(0, "count"), Some(&Value::Integer(0)));
        assert_eq!(grouped.value(0, "avg_price"), None);
    }

    #[test]
    fn order_by_descending_puts_nulls_last() {
        let sorted = sample()
            .order_by(&[SortDirective::descending("positive")])
            .unwrap();
        assert_eq!(sorted.value(0, "positive"), Some(&Value::Integer(30)));
        assert_eq!(sorted.value(3, "positive"), None);
    }

    #[test]
    fn aggregation_specs_are_validated() {
        assert!(Aggregation::parse("sum").is_err());
        assert!(Aggregation::parse("p150:price").is_err());
        assert!(Aggregation::parse("bogus:price").is_err());
        let p = Aggregation::parse("p50:price_major").unwrap();
        assert_eq!(p.reducer, Reducer::Percentile(0.5));
        assert_eq!(p.alias, "p50_price_major");
    }

    #[test]
    fn filter_and_select() {
        let frame = sample()
            .filter(&[FilterCondition::parse("positive >= 30").unwrap()])
            .unwrap()
            .select(&["entity_id".into()])
            .unwrap();
        assert_eq!(frame.columns(), ["entity_id"]);
        assert_eq!(frame.len(), 2);
        assert!(sample().filter(&[FilterCondition::parse("nope = 1").unwrap()]).is_err());
    }
}
