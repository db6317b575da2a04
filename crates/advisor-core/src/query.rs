//! Query input accepted at the edge of the system.
//!
//! Callers may hand over a bare string, a `{"query": ...}` object, or a list
//! of either. All of those collapse into [`QueryInput`] here so the pipeline
//! only ever sees plain query strings.

use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    Single(String),
    Batch(Vec<String>),
}

impl QueryInput {
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(query_text)
                .collect::<Result<Vec<_>>>()
                .map(QueryInput::Batch),
            other => query_text(other).map(QueryInput::Single),
        }
    }

    /// Trimmed, non-empty queries in input order.
    pub fn into_queries(self) -> Result<Vec<String>> {
        let raw = match self {
            QueryInput::Single(q) => vec![q],
            QueryInput::Batch(qs) => qs,
        };
        let queries: Vec<String> = raw.into_iter().map(|q| q.trim().to_string()).collect();
        if queries.is_empty() {
            return Err(Error::InvalidInput("query batch is empty".into()));
        }
        if let Some(pos) = queries.iter().position(String::is_empty) {
            return Err(Error::InvalidInput(format!("query #{} is blank", pos + 1)));
        }
        Ok(queries)
    }
}

impl From<&str> for QueryInput {
    fn from(q: &str) -> Self { QueryInput::Single(q.to_string()) }
}

impl From<Vec<String>> for QueryInput {
    fn from(mut qs: Vec<String>) -> Self {
        if qs.len() == 1 { QueryInput::Single(qs.remove(0)) } else { QueryInput::Batch(qs) }
    }
}

fn query_text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => match map.get("query") {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(Error::InvalidInput("query object needs a string 'query' field".into())),
        },
        other => Err(Error::InvalidInput(format!("unsupported query input: {other}"))),
    }
}
