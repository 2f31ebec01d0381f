use crate::{
    core::data_type::DataType,
    execution::{connection::TableRef, errors::ModelError},
    schema::column::{ColumnDef, normalize_col_name},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column layout of the target table: ordered columns plus the ordered
/// primary-key subset used for point reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRowSchema", into = "RawRowSchema")]
pub struct RowSchema {
    table: TableRef,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct RawRowSchema {
    table: TableRef,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
}

impl RowSchema {
    pub fn new(
        table: TableRef,
        columns: Vec<ColumnDef>,
        primary_key: Vec<String>,
    ) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(normalize_col_name(&col.name), i).is_some() {
                return Err(ModelError::DuplicateColumn(col.name.clone()));
            }
        }

        if primary_key.is_empty() {
            return Err(ModelError::MissingPrimaryKey(table.to_string()));
        }

        let mut key = Vec::with_capacity(primary_key.len());
        for name in primary_key {
            let ordinal = index
                .get(&normalize_col_name(&name))
                .ok_or_else(|| ModelError::UnknownKeyColumn(name.clone()))?;
            key.push(columns[*ordinal].name.clone());
        }

        Ok(RowSchema {
            table,
            columns,
            primary_key: key,
            index,
        })
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.index
            .get(&normalize_col_name(name))
            .map(|ordinal| &self.columns[*ordinal])
    }

    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.column(name).map(|c| c.data_type)
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key
            .iter()
            .any(|k| k.eq_ignore_ascii_case(name.trim()))
    }
}

impl TryFrom<RawRowSchema> for RowSchema {
    type Error = ModelError;

    fn try_from(raw: RawRowSchema) -> Result<Self, Self::Error> {
        RowSchema::new(raw.table, raw.columns, raw.primary_key)
    }
}

impl From<RowSchema> for RawRowSchema {
    fn from(schema: RowSchema) -> Self {
        RawRowSchema {
            table: schema.table,
            columns: schema.columns,
            primary_key: schema.primary_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("colid", DataType::Int),
            ColumnDef::new("cola", DataType::Text),
            ColumnDef::new("colb", DataType::Text),
        ]
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let schema =
            RowSchema::new(TableRef::new(Some("ks"), "t"), columns(), vec!["COLID".into()])
                .unwrap();
        assert_eq!(schema.data_type("ColA"), Some(DataType::Text));
        assert_eq!(schema.primary_key(), ["colid".to_string()]);
        assert!(schema.is_key_column("colid"));
        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn rejects_inconsistent_definitions() {
        let table = TableRef::new(None, "t");
        let mut dup = columns();
        dup.push(ColumnDef::new("COLA", DataType::Text));
        assert_eq!(
            RowSchema::new(table.clone(), dup, vec!["colid".into()]),
            Err(ModelError::DuplicateColumn("COLA".into()))
        );
        assert_eq!(
            RowSchema::new(table.clone(), columns(), vec!["nope".into()]),
            Err(ModelError::UnknownKeyColumn("nope".into()))
        );
        assert!(matches!(
            RowSchema::new(table, columns(), vec![]),
            Err(ModelError::MissingPrimaryKey(_))
        ));
    }

    #[test]
    fn deserializes_through_validation() {
        let json = r#"{
            "table": "ks.t",
            "columns": [{"name": "id", "type": "uuid"}, {"name": "v", "type": "double"}],
            "primary_key": ["id"]
        }"#;
        let schema: RowSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.data_type("v"), Some(DataType::Double));

        let bad = json.replace(r#"["id"]"#, r#"["x"]"#);
        assert!(serde_json::from_str::<RowSchema>(&bad).is_err());
    }
}
