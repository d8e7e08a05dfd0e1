//! ANSI SQL compiler over the query DSL.
//!
//! Compiles query trees and row operations into SQL text plus bind values in
//! document order. The compiler is dialect-aware only where capability flags
//! and type mappings demand it; everything else is plain ANSI.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::models::{RowValues, TableDefine};
use crate::query::{
    sort_by_code, CompiledQuery, Condition, ConditionCode, Item, Parameter, Query, QueryCompiler,
    QueryJoin, SortDirection,
};

/// How bind positions render in the generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite)
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

/// SQL compiler bound to one dialect and placeholder style.
pub struct SqlCompiler {
    dialect: Arc<Dialect>,
    placeholders: PlaceholderStyle,
}

/// Accumulates text fragments and bind values during one compilation.
struct SqlBuilder {
    binds: Vec<JsonValue>,
    placeholders: PlaceholderStyle,
}

impl SqlBuilder {
    fn new(placeholders: PlaceholderStyle) -> Self {
        Self {
            binds: Vec::new(),
            placeholders,
        }
    }

    /// Allocate the next bind position and return its placeholder text.
    fn push_bind(&mut self, value: JsonValue) -> String {
        self.binds.push(value);
        match self.placeholders {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${}", self.binds.len()),
        }
    }
}

fn qualified(table: &str, column: &str) -> String {
    if table.is_empty() {
        column.to_string()
    } else {
        format!("{}.{}", table, column)
    }
}

impl SqlCompiler {
    pub fn new(dialect: Arc<Dialect>, placeholders: PlaceholderStyle) -> Self {
        Self {
            dialect,
            placeholders,
        }
    }

    /// Compile a SELECT over a query tree, optionally with write-intent
    /// locking.
    pub fn select(&self, query: &Query, for_update: bool) -> DbResult<CompiledQuery> {
        query.validate()?;
        let mut builder = SqlBuilder::new(self.placeholders);
        let mut text = self.select_text(query, &mut builder)?;
        if for_update {
            text.push_str(" FOR UPDATE");
        }
        Ok(CompiledQuery::new(text, builder.binds))
    }

    /// Compile `INSERT INTO table (...) VALUES (...)`. Row keys keep their
    /// insertion order; every key must exist in the table definition.
    pub fn insert(
        &self,
        physical_table: &str,
        table: &TableDefine,
        row: &RowValues,
    ) -> DbResult<CompiledQuery> {
        if row.is_empty() {
            return Err(DbError::invalid_input("Insert row has no values"));
        }
        let mut builder = SqlBuilder::new(self.placeholders);
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row {
            if !table.has_column(column) {
                return Err(DbError::table_define(&table.name, column));
            }
            columns.push(column.clone());
            values.push(builder.push_bind(value.clone()));
        }
        let text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            physical_table,
            columns.join(", "),
            values.join(", ")
        );
        Ok(CompiledQuery::new(text, builder.binds))
    }

    /// Compile `UPDATE table SET ... WHERE ...`. SET binds precede WHERE
    /// binds, matching document order.
    pub fn update(
        &self,
        physical_table: &str,
        table: &TableDefine,
        values: &RowValues,
        condition: &Condition,
    ) -> DbResult<CompiledQuery> {
        if values.is_empty() {
            return Err(DbError::invalid_input("Update has no values to set"));
        }
        condition.validate()?;
        let mut builder = SqlBuilder::new(self.placeholders);
        let mut assignments = Vec::with_capacity(values.len());
        for (column, value) in values {
            if !table.has_column(column) {
                return Err(DbError::table_define(&table.name, column));
            }
            let placeholder = builder.push_bind(value.clone());
            assignments.push(format!("{} = {}", column, placeholder));
        }
        let where_text = self.condition_text(condition, &mut builder)?;
        let text = format!(
            "UPDATE {} SET {} WHERE {}",
            physical_table,
            assignments.join(", "),
            where_text
        );
        Ok(CompiledQuery::new(text, builder.binds))
    }

    /// Compile `DELETE FROM table WHERE ...`.
    pub fn delete(&self, physical_table: &str, condition: &Condition) -> DbResult<CompiledQuery> {
        condition.validate()?;
        let mut builder = SqlBuilder::new(self.placeholders);
        let where_text = self.condition_text(condition, &mut builder)?;
        let text = format!("DELETE FROM {} WHERE {}", physical_table, where_text);
        Ok(CompiledQuery::new(text, builder.binds))
    }

    /// Compile a SELECT matching an example row by column equality. JSON
    /// nulls in the example become IS NULL predicates. An empty example
    /// selects everything.
    pub fn select_by_example(
        &self,
        physical_table: &str,
        table: &TableDefine,
        example: &RowValues,
    ) -> DbResult<CompiledQuery> {
        let mut builder = SqlBuilder::new(self.placeholders);
        let mut predicates = Vec::with_capacity(example.len());
        for (column, value) in example {
            if !table.has_column(column) {
                return Err(DbError::table_define(&table.name, column));
            }
            if value.is_null() {
                predicates.push(format!("{} IS NULL", column));
            } else {
                let placeholder = builder.push_bind(value.clone());
                predicates.push(format!("{} = {}", column, placeholder));
            }
        }
        let mut text = format!("SELECT * FROM {}", physical_table);
        if !predicates.is_empty() {
            text.push_str(" WHERE ");
            text.push_str(&predicates.join(" AND "));
        }
        Ok(CompiledQuery::new(text, builder.binds))
    }

    /// Compile `CREATE TABLE IF NOT EXISTS` from a table definition using the
    /// dialect's type mappings. A column whose JDBC type has no mapping is a
    /// configuration defect.
    pub fn create_table(&self, physical_table: &str, table: &TableDefine) -> DbResult<String> {
        let mut columns = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let column_type = self.dialect.column_type(column);
            if column_type.is_empty() {
                return Err(DbError::configuration(format!(
                    "Dialect '{}' has no type mapping for JDBC type {} (column '{}')",
                    self.dialect.name(),
                    column.jdbc_type,
                    column.name
                )));
            }
            columns.push(format!("{} {}", column.name, column_type));
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            physical_table,
            columns.join(", ")
        ))
    }

    /// Compile a table truncation. SQLite has no TRUNCATE; an unfiltered
    /// DELETE is its equivalent.
    pub fn truncate_table(&self, physical_table: &str) -> String {
        if self.dialect.name() == "sqlite" {
            format!("DELETE FROM {}", physical_table)
        } else {
            format!("TRUNCATE TABLE {}", physical_table)
        }
    }

    /// Compile a table drop.
    pub fn drop_table(&self, physical_table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", physical_table)
    }

    fn select_text(&self, query: &Query, builder: &mut SqlBuilder) -> DbResult<String> {
        let items = query.sorted_items();
        let distinct = items.iter().any(|item| {
            matches!(item, Item::Column { distinct, .. } if *distinct)
        });
        let projection = if items.is_empty() {
            "*".to_string()
        } else {
            let rendered: DbResult<Vec<String>> = items
                .iter()
                .map(|item| self.item_text(item, builder))
                .collect();
            rendered?.join(", ")
        };

        let mut text = format!(
            "SELECT {}{} FROM {}",
            if distinct { "DISTINCT " } else { "" },
            projection,
            query.table
        );

        let joins = query.sorted_joins();
        if !joins.is_empty() {
            if !self.dialect.support_join() {
                return Err(DbError::invalid_input(format!(
                    "Dialect '{}' does not support joins",
                    self.dialect.name()
                )));
            }
            for join in &joins {
                text.push(' ');
                text.push_str(&self.join_text(join));
            }
        }

        if let Some(condition) = &query.condition {
            text.push_str(" WHERE ");
            text.push_str(&self.condition_text(condition, builder)?);
        }

        if !query.group_bys.is_empty() {
            let columns: Vec<String> = query
                .group_bys
                .iter()
                .map(|group| qualified(&group.table, &group.column))
                .collect();
            text.push_str(" GROUP BY ");
            text.push_str(&columns.join(", "));
        }

        if !query.order_bys.is_empty() {
            let orders: Vec<String> = query
                .order_bys
                .iter()
                .map(|order| {
                    let direction = match order.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", qualified(&order.table, &order.column), direction)
                })
                .collect();
            text.push_str(" ORDER BY ");
            text.push_str(&orders.join(", "));
        }

        if let Some(limit) = query.limit {
            text.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            text.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(text)
    }

    fn item_text(&self, item: &Item, builder: &mut SqlBuilder) -> DbResult<String> {
        let text = match item {
            Item::Column { table, column, .. } => qualified(table, column),
            Item::Function { name, params, .. } => self.function_text(name, params, builder)?,
            Item::Query { query, .. } => format!("({})", self.select_text(query, builder)?),
        };
        Ok(match item.alias() {
            Some(alias) => format!("{} AS {}", text, alias),
            None => text,
        })
    }

    fn join_text(&self, join: &QueryJoin) -> String {
        let mut text = format!("{} {}", join.join_type.keyword(), join.join_table);
        if !join.keys.is_empty() {
            let pairs: Vec<String> = join
                .keys
                .iter()
                .map(|key| {
                    format!(
                        "{} = {}",
                        qualified(&join.driver_table, &key.join_key),
                        qualified(&join.join_table, &key.reference_key)
                    )
                })
                .collect();
            text.push_str(" ON ");
            text.push_str(&pairs.join(" AND "));
        }
        text
    }

    fn condition_text(&self, condition: &Condition, builder: &mut SqlBuilder) -> DbResult<String> {
        match condition {
            Condition::Group(group) => {
                if group.children.is_empty() {
                    return Err(DbError::invalid_input("Condition group has no children"));
                }
                let children: DbResult<Vec<String>> = group
                    .children
                    .iter()
                    .map(|child| self.condition_text(child, builder))
                    .collect();
                let separator = format!(" {} ", group.conjunction.keyword());
                Ok(format!("({})", children?.join(&separator)))
            }
            Condition::Column(leaf) => {
                let column = qualified(&leaf.table, &leaf.column);
                let lhs = match &leaf.function {
                    Some(function) => format!("{}({})", function, column),
                    None => column,
                };
                if leaf.code.is_nullary() {
                    return Ok(format!("{} {}", lhs, leaf.code.symbol()));
                }
                // validate() has already established parameter presence/shape
                let parameter = leaf
                    .parameter
                    .as_ref()
                    .ok_or_else(|| DbError::invalid_input("Condition missing parameter"))?;
                match (leaf.code, parameter) {
                    (code, Parameter::Ranges { begin, end, .. }) if code.wants_ranges() => {
                        let begin_ph = builder.push_bind(begin.clone());
                        let end_ph = builder.push_bind(end.clone());
                        Ok(format!(
                            "{} {} {} AND {}",
                            lhs,
                            code.symbol(),
                            begin_ph,
                            end_ph
                        ))
                    }
                    (code, Parameter::Arrays { values, .. }) if code.wants_arrays() => {
                        if values.is_empty() {
                            return Err(DbError::invalid_input("IN list must not be empty"));
                        }
                        let placeholders: Vec<String> = values
                            .iter()
                            .map(|value| builder.push_bind(value.clone()))
                            .collect();
                        Ok(format!(
                            "{} {} ({})",
                            lhs,
                            code.symbol(),
                            placeholders.join(", ")
                        ))
                    }
                    (ConditionCode::Exists | ConditionCode::NotExists, parameter) => {
                        let Parameter::Query { query, .. } = parameter else {
                            return Err(DbError::invalid_input(
                                "EXISTS requires a sub-query parameter",
                            ));
                        };
                        let subquery = self.select_text(query, builder)?;
                        Ok(format!("{} ({})", leaf.code.symbol(), subquery))
                    }
                    (code, parameter) => {
                        let rhs = self.parameter_text(parameter, builder)?;
                        Ok(format!("{} {} {}", lhs, code.symbol(), rhs))
                    }
                }
            }
        }
    }

    fn parameter_text(&self, parameter: &Parameter, builder: &mut SqlBuilder) -> DbResult<String> {
        match parameter {
            Parameter::Column { table, column, .. } => Ok(qualified(table, column)),
            Parameter::Constant { value, .. } => Ok(builder.push_bind(value.clone())),
            Parameter::Function { name, params, .. } => self.function_text(name, params, builder),
            Parameter::Query {
                query, function, ..
            } => {
                let subquery = format!("({})", self.select_text(query, builder)?);
                Ok(match function {
                    Some(function) => format!("{}{}", function, subquery),
                    None => subquery,
                })
            }
            Parameter::Ranges { .. } | Parameter::Arrays { .. } => Err(DbError::invalid_input(
                "Ranges and Arrays are only valid as BETWEEN/IN operands",
            )),
        }
    }

    /// Function arguments honor sort codes before rendering.
    fn function_text(
        &self,
        name: &str,
        params: &[Parameter],
        builder: &mut SqlBuilder,
    ) -> DbResult<String> {
        let mut params = params.to_vec();
        sort_by_code(&mut params, Parameter::sort);
        let rendered: DbResult<Vec<String>> = params
            .iter()
            .map(|param| self.parameter_text(param, builder))
            .collect();
        Ok(format!("{}({})", name, rendered?.join(", ")))
    }
}

impl QueryCompiler for SqlCompiler {
    fn compile(&self, query: &Query) -> DbResult<CompiledQuery> {
        self.select(query, false)
    }
}
