//! Attribute facets: name/value pairs such as `color: red`, `size: XL`.

use std::cmp::Ordering;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Document count for one attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValueCount {
    pub value: String,
    pub count: u64,
}

/// Counts for one attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCount {
    pub name: String,
    /// Number of documents carrying this attribute at all.
    pub doc_count: u64,
    /// Value counts, most frequent first.
    pub values: Vec<AttributeValueCount>,
}

/// Attribute representation of a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeResults {
    /// Attribute names, most frequent first.
    pub attributes: Vec<AttributeCount>,
}

impl AttributeResults {
    pub fn get(&self, name: &str) -> Option<&AttributeCount> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Document count for a `name: value` pair.
    pub fn value_count(&self, name: &str, value: &str) -> Option<u64> {
        self.get(name)?
            .values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.count)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[derive(Debug, Default)]
struct NameCounts {
    doc_count: u64,
    values: AHashMap<String, u64>,
}

/// Accumulates attribute counts document by document.
#[derive(Debug, Default)]
pub struct AttributeCounter {
    names: AHashMap<String, NameCounts>,
    docs_counted: u64,
}

impl AttributeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one document's attributes. Repeated pairs count once.
    pub fn add_doc<'a, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        self.docs_counted += 1;

        let mut seen_names = AHashSet::new();
        let mut seen_pairs = AHashSet::new();
        for (name, value) in attributes {
            if !seen_pairs.insert((name.as_str(), value.as_str())) {
                continue;
            }
            let counts = self.names.entry(name.clone()).or_default();
            if seen_names.insert(name.as_str()) {
                counts.doc_count += 1;
            }
            *counts.values.entry(value.clone()).or_insert(0) += 1;
        }
    }

    /// Number of documents passed to [`add_doc`](Self::add_doc).
    pub fn docs_counted(&self) -> u64 {
        self.docs_counted
    }

    /// Build the representation, keeping at most `max_attributes` names.
    pub fn results(&self, max_attributes: usize) -> AttributeResults {
        let mut attributes: Vec<AttributeCount> = self
            .names
            .iter()
            .map(|(name, counts)| {
                let mut values: Vec<AttributeValueCount> = counts
                    .values
                    .iter()
                    .map(|(value, &count)| AttributeValueCount {
                        value: value.clone(),
                        count,
                    })
                    .collect();
                values.sort_by(|a, b| match b.count.cmp(&a.count) {
                    Ordering::Equal => a.value.cmp(&b.value),
                    other => other,
                });

                AttributeCount {
                    name: name.clone(),
                    doc_count: counts.doc_count,
                    values,
                }
            })
            .collect();

        attributes.sort_by(|a, b| match b.doc_count.cmp(&a.doc_count) {
            Ordering::Equal => a.name.cmp(&b.name),
            other => other,
        });
        attributes.truncate(max_attributes);

        AttributeResults { attributes }
    }
}
