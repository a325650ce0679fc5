//! A small typed subset of the document store query language.
//!
//! Only the clauses the engine emits are modelled. [`Query::to_json`]
//! renders the wire form.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
    Wildcard { field: String, pattern: String },
    Exists { field: String },
    Nested { path: String, query: Box<Query> },
    Bool(BoolQuery),
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: impl Into<String>, gte: impl Into<Value>, lte: impl Into<Value>) -> Self {
        Query::Range {
            field: field.into(),
            gte: Some(gte.into()),
            lte: Some(lte.into()),
        }
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Query::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn nested(path: impl Into<String>, query: Query) -> Self {
        Query::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    /// `field` equals one of `values`: a single value renders as a term
    /// query, several as a terms query.
    pub fn one_of(field: impl Into<String>, values: &[String]) -> Self {
        match values {
            [single] => Query::term(field, single.as_str()),
            many => Query::terms(field, many.iter().map(String::as_str)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({"match_all": {}}),
            Query::Term { field, value } => json!({"term": {field: value}}),
            Query::Terms { field, values } => json!({"terms": {field: values}}),
            Query::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(v) = gte {
                    bounds.insert("gte".into(), v.clone());
                }
                if let Some(v) = lte {
                    bounds.insert("lte".into(), v.clone());
                }
                json!({"range": {field: bounds}})
            }
            Query::Wildcard { field, pattern } => {
                json!({"wildcard": {field: {"value": pattern}}})
            }
            Query::Exists { field } => json!({"exists": {"field": field}}),
            Query::Nested { path, query } => {
                json!({"nested": {"path": path, "query": query.to_json()}})
            }
            Query::Bool(b) => b.to_json(),
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<BoolQuery> for Query {
    fn from(b: BoolQuery) -> Self {
        Query::Bool(b)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub filter: Vec<Query>,
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, q: Query) -> Self {
        self.filter.push(q);
        self
    }

    pub fn must(mut self, q: Query) -> Self {
        self.must.push(q);
        self
    }

    pub fn should(mut self, q: Query) -> Self {
        self.should.push(q);
        self
    }

    pub fn must_not(mut self, q: Query) -> Self {
        self.must_not.push(q);
        self
    }

    pub fn minimum_should_match(mut self, n: u32) -> Self {
        self.minimum_should_match = Some(n);
        self
    }

    /// OR of `queries`: at least one must match.
    pub fn any_of(queries: Vec<Query>) -> Self {
        Self {
            should: queries,
            minimum_should_match: Some(1),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (name, clauses) in [
            ("filter", &self.filter),
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    name.into(),
                    Value::Array(clauses.iter().map(Query::to_json).collect()),
                );
            }
        }
        if let Some(n) = self.minimum_should_match {
            body.insert("minimum_should_match".into(), json!(n));
        }
        json!({"bool": body})
    }
}
