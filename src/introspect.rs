//! Schema snapshot loading from DuckDB's catalog functions

use crate::error::Result;
use crate::schema::{Column, ForeignKey, Index, Schema, Table, View};
use regex::Regex;
use std::collections::HashSet;

const SCOPE: &str = "database_name = current_database() AND schema_name = current_schema()";

/// Read tables, columns, constraints, indexes and views of the current schema.
pub fn load_schema(conn: &duckdb::Connection) -> Result<Schema> {
    let mut schema = Schema::new();

    let mut stmt = conn.prepare(&format!(
        "SELECT table_name FROM duckdb_tables() WHERE {SCOPE} AND NOT internal AND NOT temporary ORDER BY table_name"
    ))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for name in names {
        schema.add_table(Table::new(name?));
    }

    load_columns(conn, &mut schema)?;
    load_constraints(conn, &mut schema)?;
    load_indexes(conn, &mut schema)?;
    load_views(conn, &mut schema)?;

    Ok(schema)
}

struct ColumnRow {
    table: String,
    name: String,
    data_type: String,
    nullable: bool,
    default: Option<String>,
    length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
}

fn load_columns(conn: &duckdb::Connection, schema: &mut Schema) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, column_name, data_type, is_nullable, column_default, \
                character_maximum_length, numeric_precision, numeric_scale \
         FROM duckdb_columns() WHERE {SCOPE} ORDER BY table_name, column_index"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnRow {
            table: row.get(0)?,
            name: row.get(1)?,
            data_type: row.get(2)?,
            nullable: row.get::<_, Option<bool>>(3)?.unwrap_or(true),
            default: row.get(4)?,
            length: row.get(5)?,
            precision: row.get(6)?,
            scale: row.get(7)?,
        })
    })?;

    for row in rows {
        let row = row?;
        // duckdb_columns() also lists view columns
        if let Some(table) = schema.tables.get_mut(&row.table) {
            table.add_column(column_from_catalog(row));
        }
    }
    Ok(())
}

fn column_from_catalog(row: ColumnRow) -> Column {
    let (type_name, unsigned) = logical_type(&row.data_type);
    let mut column = Column::new(row.name, type_name);
    column.unsigned = unsigned;
    column.nullable = row.nullable;
    column.autoincrement = row
        .default
        .as_deref()
        .map_or(false, |d| d.trim_start().to_lowercase().starts_with("nextval("));
    column.default = row.default;
    match column.type_name.as_str() {
        "decimal" => {
            column.precision = row.precision.map(|p| p as u32);
            column.scale = row.scale.map(|s| s as u32);
        }
        "string" => column.length = row.length.map(|l| l as u32),
        _ => {}
    }
    column
}

/// Map a DuckDB type name to a logical type tag and unsigned flag.
pub fn logical_type(data_type: &str) -> (String, bool) {
    let upper = data_type.trim().to_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();
    let (tag, unsigned) = match base {
        "TINYINT" | "SMALLINT" => ("smallint", false),
        "UTINYINT" | "USMALLINT" => ("smallint", true),
        "INTEGER" => ("integer", false),
        "UINTEGER" => ("integer", true),
        "BIGINT" | "HUGEINT" => ("bigint", false),
        "UBIGINT" | "UHUGEINT" => ("bigint", true),
        "BOOLEAN" => ("boolean", false),
        "FLOAT" | "REAL" | "DOUBLE" => ("float", false),
        "DECIMAL" | "NUMERIC" => ("decimal", false),
        "VARCHAR" => ("string", false),
        "DATE" => ("date", false),
        "TIMESTAMP" | "TIMESTAMP_S" | "TIMESTAMP_MS" | "TIMESTAMP_NS" => ("datetime", false),
        "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => ("datetimetz", false),
        "TIME" => ("time", false),
        "BLOB" => ("blob", false),
        "UUID" => ("guid", false),
        "JSON" => ("json", false),
        _ => return (data_type.trim().to_lowercase(), false),
    };
    (tag.to_string(), unsigned)
}

fn load_constraints(conn: &duckdb::Connection, schema: &mut Schema) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, constraint_type, constraint_name, \
                array_to_string(constraint_column_names, chr(9)), \
                referenced_table, array_to_string(referenced_column_names, chr(9)) \
         FROM duckdb_constraints() \
         WHERE {SCOPE} AND constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY') \
         ORDER BY table_name, constraint_index"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut seen = HashSet::new();
    for row in rows {
        let (table_name, kind, name, columns, referenced_table, referenced_columns) = row?;
        let Some(table) = schema.tables.get_mut(&table_name) else {
            continue;
        };
        let columns = split_names(columns.as_deref());
        let name = name.unwrap_or_else(|| format!("{}_{}", table_name, columns.join("_")));
        if !seen.insert((table_name.clone(), kind.clone(), name.clone())) {
            continue;
        }

        match kind.as_str() {
            "PRIMARY KEY" => table.set_primary_key(columns),
            "UNIQUE" => table.add_index(Index {
                name,
                columns,
                unique: true,
                primary: false,
                implicit: false,
            }),
            "FOREIGN KEY" => table.foreign_keys.push(ForeignKey {
                name,
                local_columns: columns,
                foreign_table: referenced_table.unwrap_or_default(),
                foreign_columns: split_names(referenced_columns.as_deref()),
                options: Default::default(),
            }),
            _ => {}
        }
    }
    Ok(())
}

fn split_names(joined: Option<&str>) -> Vec<String> {
    joined
        .filter(|s| !s.is_empty())
        .map(|s| s.split('\t').map(str::to_string).collect())
        .unwrap_or_default()
}

fn load_indexes(conn: &duckdb::Connection, schema: &mut Schema) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, index_name, is_unique, is_primary, sql \
         FROM duckdb_indexes() WHERE {SCOPE} ORDER BY table_name, index_name"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<bool>>(2)?.unwrap_or(false),
            row.get::<_, Option<bool>>(3)?.unwrap_or(false),
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    for row in rows {
        let (table_name, name, unique, primary, sql) = row?;
        // primary keys come from the constraint catalog
        if primary {
            continue;
        }
        let Some(table) = schema.tables.get_mut(&table_name) else {
            continue;
        };
        let columns = sql.as_deref().map(index_columns).unwrap_or_default();
        table.add_index(Index {
            name,
            columns,
            unique,
            primary: false,
            implicit: false,
        });
    }
    Ok(())
}

/// Column list of a `CREATE INDEX name ON table (a, "b")` statement.
pub fn index_columns(sql: &str) -> Vec<String> {
    let upper = sql.to_uppercase();
    let Some(on) = upper.find(" ON ") else {
        return Vec::new();
    };
    let (Some(open), Some(close)) = (sql[on..].find('('), sql.rfind(')')) else {
        return Vec::new();
    };
    let open = on + open;
    if close <= open {
        return Vec::new();
    }
    sql[open + 1..close]
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn load_views(conn: &duckdb::Connection, schema: &mut Schema) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT view_name, sql FROM duckdb_views() \
         WHERE {SCOPE} AND NOT internal AND NOT temporary ORDER BY view_name"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let body = Regex::new(r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMP(?:ORARY)?\s+)?VIEW\s+.+?\s+AS\s+(.*)$")?;
    for row in rows {
        let (name, sql) = row?;
        let sql = sql.unwrap_or_default();
        let select = body
            .captures(&sql)
            .and_then(|c| c.get(1))
            .map_or(sql.as_str(), |m| m.as_str());
        schema.add_view(View::new(name, select.trim().trim_end_matches(';').trim()));
    }
    Ok(())
}
