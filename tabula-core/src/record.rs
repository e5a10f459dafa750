use crate::{Error, Result, Row, RowNames, Value};
use std::{collections::BTreeMap, ops::Index, sync::Arc};

/// A decoded row keyed by the projection labels (`column` or `table.column` when joined).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    labels: RowNames,
    values: Row,
}

impl Record {
    pub fn new(labels: RowNames, values: Row) -> Result<Self> {
        if labels.len() != values.len() {
            return Err(Error::invalid_input(
                format!("{} values", values.len()),
                format!("{} values matching the labels {:?}", labels.len(), labels),
            ));
        }
        Ok(Self { labels, values })
    }
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == label)
            .map(|i| &self.values[i])
    }
    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|v| v == label)
    }
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.labels
            .iter()
            .cloned()
            .zip(self.values.into_vec())
            .collect()
    }
    /// JSON object with one member per label.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }
    /// Label/value pairs, used to feed a record back into `insert` or `update`.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.labels
            .iter()
            .cloned()
            .zip(self.values.into_vec())
            .collect()
    }
}

impl Index<&str> for Record {
    type Output = Value;
    fn index(&self, label: &str) -> &Self::Output {
        match self.get(label) {
            Some(v) => v,
            None => panic!("Record has no label `{label}`, available {:?}", self.labels),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let (labels, values): (Vec<String>, Vec<Value>) = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            labels: Arc::from(labels),
            values: values.into_boxed_slice(),
        }
    }
}

/// What a primary key lookup yields: the bare value of a two column table, the whole row otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(Value),
    Record(Record),
}

impl Entry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Record(..) => None,
        }
    }
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Entry::Record(v) => Some(v),
            Entry::Value(..) => None,
        }
    }
}

impl<T: Into<Value>> From<T> for Entry {
    fn from(value: T) -> Self {
        Entry::Value(value.into())
    }
}

impl From<Record> for Entry {
    fn from(value: Record) -> Self {
        Entry::Record(value)
    }
}
