//! Property-based sorting of ranked results.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{RankflowError, Result};
use crate::property::{PropertyColumn, PropertyTable, PropertyValue};
use crate::store::DocId;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// What a sort key compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortTarget {
    /// The fused relevance score.
    Relevance,
    /// The custom ranker score.
    CustomScore,
    /// A document property.
    Property(String),
}

/// One key of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub target: SortTarget,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn relevance() -> Self {
        SortField {
            target: SortTarget::Relevance,
            order: SortOrder::Descending,
        }
    }

    pub fn custom_score(order: SortOrder) -> Self {
        SortField {
            target: SortTarget::CustomScore,
            order,
        }
    }

    pub fn property(name: impl Into<String>, order: SortOrder) -> Self {
        SortField {
            target: SortTarget::Property(name.into()),
            order,
        }
    }

    /// Property name, if this key sorts by a property.
    pub fn property_name(&self) -> Option<&str> {
        match &self.target {
            SortTarget::Property(name) => Some(name),
            _ => None,
        }
    }
}

/// True when the sort keys amount to plain relevance order and need no sorter.
pub fn is_relevance_order(fields: &[SortField]) -> bool {
    match fields {
        [] => true,
        [field] => *field == SortField::relevance(),
        _ => false,
    }
}

/// Property values of the result rows for one sort property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortColumn {
    pub property: String,
    pub values: Vec<PropertyValue>,
}

/// Supplies the sort keys of a sorted query.
pub trait PropertySorter: Send + Sync + Debug {
    fn sort_fields(&self) -> &[SortField];

    /// Values aligned with [`sort_fields`](Self::sort_fields); null for
    /// keys that are not properties.
    fn sort_values(&self, doc_id: DocId) -> Vec<PropertyValue>;
}

/// Creates a sorter for the sort keys of a query.
pub trait SorterFactory: Send + Sync + Debug {
    fn create_sorter(&self, fields: &[SortField]) -> Result<Box<dyn PropertySorter>>;
}

/// Sorter reading property columns of a [`PropertyTable`].
#[derive(Debug)]
pub struct TableSorter {
    fields: Vec<SortField>,
    columns: Vec<Option<Arc<RwLock<PropertyColumn>>>>,
}

impl PropertySorter for TableSorter {
    fn sort_fields(&self) -> &[SortField] {
        &self.fields
    }

    fn sort_values(&self, doc_id: DocId) -> Vec<PropertyValue> {
        self.columns
            .iter()
            .map(|column| match column {
                Some(column) => column.read().get(doc_id).clone(),
                None => PropertyValue::Null,
            })
            .collect()
    }
}

/// Creates [`TableSorter`]s, rejecting unknown sort properties.
#[derive(Debug, Clone)]
pub struct TableSorterFactory {
    table: Arc<PropertyTable>,
}

impl TableSorterFactory {
    pub fn new(table: Arc<PropertyTable>) -> Self {
        TableSorterFactory { table }
    }
}

impl SorterFactory for TableSorterFactory {
    fn create_sorter(&self, fields: &[SortField]) -> Result<Box<dyn PropertySorter>> {
        let columns = fields
            .iter()
            .map(|field| match field.property_name() {
                Some(name) => self.table.existing_column(name).map(Some).ok_or_else(|| {
                    RankflowError::invalid_argument(format!("unknown sort property {name:?}"))
                }),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(TableSorter {
            fields: fields.to_vec(),
            columns,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_order_detection() {
        assert!(is_relevance_order(&[]));
        assert!(is_relevance_order(&[SortField::relevance()]));
        assert!(!is_relevance_order(&[SortField {
            target: SortTarget::Relevance,
            order: SortOrder::Ascending
        }]));
        assert!(!is_relevance_order(&[SortField::property(
            "price",
            SortOrder::Ascending
        )]));
    }

    #[test]
    fn test_table_sorter_values() {
        let table = Arc::new(PropertyTable::new());
        table.set_value("price", 1, 9.5);
        let factory = TableSorterFactory::new(table);

        let sorter = factory
            .create_sorter(&[
                SortField::property("price", SortOrder::Ascending),
                SortField::relevance(),
            ])
            .unwrap();

        assert_eq!(sorter.sort_fields().len(), 2);
        assert_eq!(
            sorter.sort_values(1),
            vec![PropertyValue::Float(9.5), PropertyValue::Null]
        );
        assert_eq!(
            sorter.sort_values(0),
            vec![PropertyValue::Null, PropertyValue::Null]
        );
    }

    #[test]
    fn test_unknown_sort_property() {
        let factory = TableSorterFactory::new(Arc::new(PropertyTable::new()));
        let result = factory.create_sorter(&[SortField::property("rating", SortOrder::Descending)]);
        assert!(matches!(result, Err(RankflowError::InvalidArgument(_))));
    }

    #[test]
    fn test_sort_field_json() {
        let fields: Vec<SortField> = serde_json::from_str(
            r#"[{"target": {"property": "price"}, "order": "ascending"}, {"target": "relevance"}]"#,
        )
        .unwrap();
        assert_eq!(fields[0], SortField::property("price", SortOrder::Ascending));
        assert_eq!(fields[1], SortField::relevance());
    }
}
