//! Declarative document filters.
//!
//! A filter is a JSON object in the MongoDB style:
//!
//! ```text
//! { "status": "open", "size": { "$gte": 3, "$lt": 10 }, "$or": [ {..}, {..} ] }
//! ```
//!
//! [`Query::compile`] turns the JSON into a predicate tree once; the tree is
//! then evaluated against each document of a full-table scan.
//!
//! ## Supported operators
//!
//! | kind | operators |
//! |---|---|
//! | comparison | `$eq $ne $gt $gte $lt $lte $in $nin` |
//! | element | `$exists $type` |
//! | array | `$size $all $elemMatch` |
//! | logical | `$and $or $nor` (top level), `$not` (field level) |
//!
//! Field names may be dot paths (`"a.b.0.c"`). When a path crosses an array
//! the remaining path is applied to every element, and a condition on an
//! array field also matches if any element satisfies it (`{"tags": "x"}`
//! matches `{"tags": ["x", "y"]}`).

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::QueryError;
use crate::value::{compare, deep_equal};

/// A compiled filter.
#[derive(Debug, Clone)]
pub struct Query {
    root: Predicate,
}

#[derive(Debug, Clone)]
enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Nor(Vec<Predicate>),
    Field { path: Vec<String>, cond: Condition },
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(Value),
    Ne(Value),
    Cmp(Ordering, bool, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Type(JsonType),
    Size(usize),
    All(Vec<Value>),
    ElemMatch(ElemMatch),
    Not(Box<Condition>),
    AllOf(Vec<Condition>),
}

#[derive(Debug, Clone)]
enum ElemMatch {
    /// `{"$elemMatch": {"$gt": 1}}` - conditions on the element itself.
    Value(Box<Condition>),
    /// `{"$elemMatch": {"a": 1}}` - a sub-filter on object elements.
    Document(Box<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Query {
    /// Compile a filter specification.
    pub fn compile(filter: &Value) -> Result<Self, QueryError> {
        let map = filter
            .as_object()
            .ok_or_else(|| QueryError::NotAnObject(filter.to_string()))?;
        Ok(Self {
            root: compile_filter(map)?,
        })
    }

    /// A query that matches every document.
    pub fn match_all() -> Self {
        Self {
            root: Predicate::And(Vec::new()),
        }
    }

    /// Test a single document.
    pub fn matches(&self, doc: &Document) -> bool {
        self.root.eval(doc)
    }

    /// Return copies of the documents that match, in input order.
    pub fn find(&self, docs: &[Document]) -> Vec<Document> {
        docs.iter().filter(|d| self.matches(d)).cloned().collect()
    }
}

/// Returns true if `filter` is a non-empty object, i.e. it actually constrains
/// the result. Empty objects and non-objects mean "everything".
pub fn is_constraining(filter: &Value) -> bool {
    filter.as_object().map_or(false, |m| !m.is_empty())
}

fn compile_filter(map: &Map<String, Value>) -> Result<Predicate, QueryError> {
    let mut preds = Vec::with_capacity(map.len());
    for (key, value) in map {
        let pred = match key.as_str() {
            "$and" => Predicate::And(compile_filter_list(key, value)?),
            "$or" => Predicate::Or(compile_filter_list(key, value)?),
            "$nor" => Predicate::Nor(compile_filter_list(key, value)?),
            op if op.starts_with('$') => return Err(QueryError::UnknownOperator(op.to_string())),
            field => Predicate::Field {
                path: field.split('.').map(String::from).collect(),
                cond: compile_field(value)?,
            },
        };
        preds.push(pred);
    }
    Ok(if preds.len() == 1 {
        preds.remove(0)
    } else {
        Predicate::And(preds)
    })
}

fn compile_filter_list(op: &str, value: &Value) -> Result<Vec<Predicate>, QueryError> {
    let invalid = || QueryError::InvalidOperand {
        operator: op.to_string(),
        expected: "a non-empty array of filter objects",
    };
    let items = value.as_array().filter(|a| !a.is_empty()).ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| item.as_object().ok_or_else(invalid).and_then(compile_filter))
        .collect()
}

/// Compile the right-hand side of `"field": <value>`.
fn compile_field(value: &Value) -> Result<Condition, QueryError> {
    match value.as_object() {
        Some(ops) if is_operator_object(ops) => compile_operators(ops),
        _ => Ok(Condition::Eq(value.clone())),
    }
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn compile_operators(ops: &Map<String, Value>) -> Result<Condition, QueryError> {
    let mut conds = ops
        .iter()
        .map(|(op, operand)| compile_operator(op, operand))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if conds.len() == 1 {
        conds.remove(0)
    } else {
        Condition::AllOf(conds)
    })
}

fn compile_operator(op: &str, operand: &Value) -> Result<Condition, QueryError> {
    let invalid = |expected: &'static str| QueryError::InvalidOperand {
        operator: op.to_string(),
        expected,
    };
    let cond = match op {
        "$eq" => Condition::Eq(operand.clone()),
        "$ne" => Condition::Ne(operand.clone()),
        "$gt" => Condition::Cmp(Ordering::Greater, false, operand.clone()),
        "$gte" => Condition::Cmp(Ordering::Greater, true, operand.clone()),
        "$lt" => Condition::Cmp(Ordering::Less, false, operand.clone()),
        "$lte" => Condition::Cmp(Ordering::Less, true, operand.clone()),
        "$in" => Condition::In(operand.as_array().ok_or_else(|| invalid("an array"))?.clone()),
        "$nin" => Condition::Nin(operand.as_array().ok_or_else(|| invalid("an array"))?.clone()),
        "$all" => Condition::All(operand.as_array().ok_or_else(|| invalid("an array"))?.clone()),
        "$exists" => Condition::Exists(truthy(operand)),
        "$type" => {
            let name = operand.as_str().ok_or_else(|| invalid("a type name"))?;
            Condition::Type(JsonType::parse(name)?)
        }
        "$size" => {
            let n = operand
                .as_u64()
                .ok_or_else(|| invalid("a non-negative integer"))?;
            Condition::Size(n as usize)
        }
        "$not" => match operand.as_object() {
            Some(inner) if is_operator_object(inner) => {
                Condition::Not(Box::new(compile_operators(inner)?))
            }
            _ => return Err(invalid("an operator object")),
        },
        "$elemMatch" => {
            let inner = operand
                .as_object()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| invalid("a non-empty object"))?;
            let is_value_match = is_operator_object(inner)
                && !inner.keys().any(|k| matches!(k.as_str(), "$and" | "$or" | "$nor"));
            if is_value_match {
                Condition::ElemMatch(ElemMatch::Value(Box::new(compile_operators(inner)?)))
            } else {
                Condition::ElemMatch(ElemMatch::Document(Box::new(compile_filter(inner)?)))
            }
        }
        other => return Err(QueryError::UnknownOperator(other.to_string())),
    };
    Ok(cond)
}

/// `$exists` accepts booleans and, like most engines, numbers (0 = false).
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        _ => true,
    }
}

impl JsonType {
    fn parse(name: &str) -> Result<Self, QueryError> {
        Ok(match name {
            "null" => JsonType::Null,
            "bool" | "boolean" => JsonType::Bool,
            "number" | "int" | "double" | "long" | "decimal" => JsonType::Number,
            "string" => JsonType::String,
            "array" => JsonType::Array,
            "object" => JsonType::Object,
            other => return Err(QueryError::UnknownType(other.to_string())),
        })
    }

    fn of(v: &Value) -> Self {
        match v {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

impl Predicate {
    fn eval(&self, doc: &Document) -> bool {
        match self {
            Predicate::And(ps) => ps.iter().all(|p| p.eval(doc)),
            Predicate::Or(ps) => ps.iter().any(|p| p.eval(doc)),
            Predicate::Nor(ps) => !ps.iter().any(|p| p.eval(doc)),
            Predicate::Field { path, cond } => {
                let mut found = Vec::new();
                resolve_in_map(doc, path, &mut found);
                cond.eval(&found)
            }
        }
    }
}

/// Collect every value reachable at `path`, fanning out through arrays.
fn resolve_in_map<'a>(map: &'a Map<String, Value>, path: &[String], out: &mut Vec<&'a Value>) {
    if let Some((head, rest)) = path.split_first() {
        if let Some(v) = map.get(head) {
            resolve(v, rest, out);
        }
    }
}

fn resolve<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) {
    let Some(head) = path.first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => resolve_in_map(map, path, out),
        Value::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(item) = items.get(idx) {
                    resolve(item, &path[1..], out);
                }
            }
            for item in items.iter().filter(|i| i.is_object()) {
                resolve(item, path, out);
            }
        }
        _ => {}
    }
}

impl Condition {
    /// Evaluate against every value found at the field path.
    fn eval(&self, found: &[&Value]) -> bool {
        match self {
            Condition::Eq(target) => eq_any(found, target),
            Condition::Ne(target) => !eq_any(found, target),
            Condition::Cmp(ord, inclusive, target) => any_scalar(found, |v| {
                compare(v, target).map_or(false, |o| o == *ord || (*inclusive && o == Ordering::Equal))
            }),
            Condition::In(targets) => targets.iter().any(|t| eq_any(found, t)),
            Condition::Nin(targets) => !targets.iter().any(|t| eq_any(found, t)),
            Condition::Exists(want) => !found.is_empty() == *want,
            Condition::Type(ty) => found.iter().any(|v| {
                JsonType::of(v) == *ty
                    || v.as_array().map_or(false, |a| a.iter().any(|e| JsonType::of(e) == *ty))
            }),
            Condition::Size(n) => found
                .iter()
                .any(|v| v.as_array().map_or(false, |a| a.len() == *n)),
            Condition::All(targets) => {
                !targets.is_empty() && targets.iter().all(|t| eq_any(found, t))
            }
            Condition::ElemMatch(m) => found.iter().filter_map(|v| v.as_array()).any(|items| {
                items.iter().any(|item| match m {
                    ElemMatch::Value(cond) => cond.eval(&[item]),
                    ElemMatch::Document(pred) => item.as_object().map_or(false, |o| pred.eval(o)),
                })
            }),
            Condition::Not(inner) => !inner.eval(found),
            Condition::AllOf(conds) => conds.iter().all(|c| c.eval(found)),
        }
    }
}

/// Equality in the query sense: a missing field equals `null`, and an array
/// field equals `target` if it is `target` or contains it.
fn eq_any(found: &[&Value], target: &Value) -> bool {
    if found.is_empty() {
        return target.is_null();
    }
    found.iter().any(|v| {
        deep_equal(v, target)
            || v.as_array().map_or(false, |a| a.iter().any(|e| deep_equal(e, target)))
    })
}

/// Apply `test` to each found value, and to the elements of found arrays.
fn any_scalar(found: &[&Value], test: impl Fn(&Value) -> bool) -> bool {
    found.iter().any(|&v| match v {
        Value::Array(items) => items.iter().any(&test),
        other => test(other),
    })
}
