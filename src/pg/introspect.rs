use crate::model::*;
use crate::pg::connection::PgConnection;
use crate::pg::values::{DataType, TypeCatalog};
use crate::util::{quote_ident, quote_qualified, Result, SchemaError};
use sqlx::Row;
use std::collections::BTreeMap;

/// Reads every object of `namespaces` into a snapshot.
pub async fn introspect_snapshot(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<SchemaSnapshot> {
    let mut snapshot = SchemaSnapshot::new();

    snapshot.schemas = introspect_schemas(connection, namespaces).await?;
    snapshot.tables = introspect_tables(connection, namespaces).await?;
    introspect_columns(connection, namespaces, &mut snapshot.tables).await?;
    introspect_constraints(connection, namespaces, &mut snapshot.tables).await?;

    let (views, materialized_views) = introspect_views(connection, namespaces).await?;
    snapshot.views = views;
    snapshot.materialized_views = materialized_views;

    introspect_indexes(connection, namespaces, &mut snapshot).await?;
    introspect_relation_privileges(connection, namespaces, &mut snapshot).await?;
    introspect_view_dependencies(connection, namespaces, &mut snapshot).await?;

    snapshot.functions = introspect_functions(connection, namespaces).await?;
    snapshot.sequences = introspect_sequences(connection, namespaces).await?;

    tracing::info!(
        schemas = snapshot.schemas.len(),
        tables = snapshot.tables.len(),
        views = snapshot.views.len(),
        materialized_views = snapshot.materialized_views.len(),
        functions = snapshot.functions.len(),
        sequences = snapshot.sequences.len(),
        "catalog collected"
    );

    Ok(snapshot)
}

/// Loads `pg_type`, used to render row values.
pub async fn introspect_type_catalog(connection: &PgConnection) -> Result<TypeCatalog> {
    let rows = sqlx::query(
        r#"
        SELECT t.oid::int8 AS oid, t.typname::text AS typname, t.typcategory::text AS typcategory
        FROM pg_type t
        "#,
    )
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch data types: {e}")))?;

    let types = rows.into_iter().map(|row| DataType {
        oid: row.get::<i64, _>("oid") as u32,
        typname: row.get("typname"),
        typcategory: category(row.get("typcategory")),
    });
    Ok(TypeCatalog::new(types))
}

fn category(value: String) -> char {
    value.chars().next().unwrap_or('X')
}

async fn introspect_schemas(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<BTreeMap<String, Namespace>> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS name, pg_get_userbyid(n.nspowner) AS owner
        FROM pg_namespace n
        WHERE n.nspname = ANY($1::text[])
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch schemas: {e}")))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let name: String = row.get("name");
            (
                quote_ident(&name),
                Namespace {
                    owner: row.get("owner"),
                },
            )
        })
        .collect())
}

async fn introspect_tables(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<BTreeMap<String, Table>> {
    // WITH OIDS is gone since PostgreSQL 12
    let with_oids = if connection.server_version() < 120000 {
        "c.relhasoids"
    } else {
        "false"
    };
    let query = format!(
        r#"
        SELECT n.nspname AS schema, c.relname AS name,
               pg_get_userbyid(c.relowner) AS owner, {with_oids} AS with_oids
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p')
          AND n.nspname = ANY($1::text[])
        "#
    );
    let rows = sqlx::query(&query)
        .bind(namespaces)
        .fetch_all(connection.pool())
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch tables: {e}")))?;

    let mut tables = BTreeMap::new();
    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        tables.insert(
            quote_qualified(&schema, &name),
            Table {
                owner: row.get("owner"),
                options: TableOptions {
                    with_oids: row.get("with_oids"),
                },
                columns: Default::default(),
                constraints: BTreeMap::new(),
                indexes: BTreeMap::new(),
                privileges: BTreeMap::new(),
            },
        );
    }

    Ok(tables)
}

async fn introspect_columns(
    connection: &PgConnection,
    namespaces: &[String],
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let identity = if connection.server_version() >= 100000 {
        "CASE a.attidentity WHEN 'a' THEN 'ALWAYS' WHEN 'd' THEN 'BY DEFAULT' END"
    } else {
        "NULL::text"
    };
    let query = format!(
        r#"
        SELECT n.nspname AS schema, c.relname AS table_name, a.attname AS name,
               format_type(a.atttypid, NULL) AS datatype,
               a.atttypid::int8 AS type_id,
               t.typcategory::text AS category,
               CASE WHEN a.atttypmod > 0 AND t.typname = 'numeric' THEN ((a.atttypmod - 4) >> 16) & 65535
                    WHEN a.atttypmod > 0 AND t.typname IN ('varchar', 'bpchar') THEN a.atttypmod - 4
               END AS precision,
               CASE WHEN a.atttypmod > 0 AND t.typname = 'numeric' THEN (a.atttypmod - 4) & 65535
               END AS scale,
               NOT a.attnotnull AS nullable,
               pg_get_expr(ad.adbin, ad.adrelid) AS default_value,
               {identity} AS identity
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_type t ON t.oid = a.atttypid
        LEFT JOIN pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
        WHERE c.relkind IN ('r', 'p')
          AND n.nspname = ANY($1::text[])
          AND a.attnum > 0
          AND NOT a.attisdropped
        ORDER BY n.nspname, c.relname, a.attnum
        "#
    );
    let rows = sqlx::query(&query)
        .bind(namespaces)
        .fetch_all(connection.pool())
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch columns: {e}")))?;

    for row in rows {
        let schema: String = row.get("schema");
        let table_name: String = row.get("table_name");
        let Some(table) = tables.get_mut(&quote_qualified(&schema, &table_name)) else {
            continue;
        };
        let name: String = row.get("name");
        let identity = match row.get::<Option<String>, _>("identity").as_deref() {
            Some("ALWAYS") => Some(IdentityKind::Always),
            Some("BY DEFAULT") => Some(IdentityKind::ByDefault),
            _ => None,
        };
        table.columns.insert(
            quote_ident(&name),
            Column {
                datatype: row.get("datatype"),
                data_type_id: row.get::<i64, _>("type_id") as u32,
                data_type_category: category(row.get("category")),
                precision: row.get("precision"),
                scale: row.get("scale"),
                nullable: row.get("nullable"),
                default: row.get("default_value"),
                identity,
            },
        );
    }

    Ok(())
}

async fn introspect_constraints(
    connection: &PgConnection,
    namespaces: &[String],
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, c.relname AS table_name, con.conname AS name,
               pg_get_constraintdef(con.oid) AS definition
        FROM pg_constraint con
        JOIN pg_class c ON c.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p')
          AND n.nspname = ANY($1::text[])
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch constraints: {e}")))?;

    for row in rows {
        let schema: String = row.get("schema");
        let table_name: String = row.get("table_name");
        if let Some(table) = tables.get_mut(&quote_qualified(&schema, &table_name)) {
            let name: String = row.get("name");
            table.constraints.insert(
                quote_ident(&name),
                Constraint {
                    definition: row.get("definition"),
                },
            );
        }
    }

    Ok(())
}

/// Indexes of tables and materialized views, except those backing a
/// primary key, unique or exclusion constraint.
async fn introspect_indexes(
    connection: &PgConnection,
    namespaces: &[String],
    snapshot: &mut SchemaSnapshot,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, t.relname AS relation, i.relname AS name,
               pg_get_indexdef(ix.indexrelid) AS definition
        FROM pg_index ix
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        WHERE t.relkind IN ('r', 'p', 'm')
          AND n.nspname = ANY($1::text[])
          AND NOT EXISTS (
              SELECT 1 FROM pg_constraint con
              WHERE con.conindid = ix.indexrelid
                AND con.conrelid = ix.indrelid
                AND con.contype IN ('p', 'u', 'x')
          )
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch indexes: {e}")))?;

    for row in rows {
        let schema: String = row.get("schema");
        let relation: String = row.get("relation");
        let name: String = row.get("name");
        let key = quote_qualified(&schema, &relation);
        let index = Index {
            definition: row.get("definition"),
        };

        if let Some(table) = snapshot.tables.get_mut(&key) {
            table.indexes.insert(quote_qualified(&schema, &name), index);
        } else if let Some(view) = snapshot.materialized_views.get_mut(&key) {
            view.indexes.insert(quote_qualified(&schema, &name), index);
        }
    }

    Ok(())
}

/// Table privileges of every login role on tables, views and materialized
/// views.
async fn introspect_relation_privileges(
    connection: &PgConnection,
    namespaces: &[String],
    snapshot: &mut SchemaSnapshot,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, c.relname AS name, r.rolname AS role,
               has_table_privilege(r.oid, c.oid, 'SELECT') AS can_select,
               has_table_privilege(r.oid, c.oid, 'INSERT') AS can_insert,
               has_table_privilege(r.oid, c.oid, 'UPDATE') AS can_update,
               has_table_privilege(r.oid, c.oid, 'DELETE') AS can_delete,
               has_table_privilege(r.oid, c.oid, 'TRUNCATE') AS can_truncate,
               has_table_privilege(r.oid, c.oid, 'REFERENCES') AS can_references,
               has_table_privilege(r.oid, c.oid, 'TRIGGER') AS can_trigger
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        CROSS JOIN pg_roles r
        WHERE c.relkind IN ('r', 'p', 'v', 'm')
          AND n.nspname = ANY($1::text[])
          AND r.rolcanlogin
          AND r.rolname !~ '^pg_'
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch table privileges: {e}")))?;

    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        let role: String = row.get("role");
        let key = quote_qualified(&schema, &name);
        let privileges = TablePrivileges {
            select: row.get("can_select"),
            insert: row.get("can_insert"),
            update: row.get("can_update"),
            delete: row.get("can_delete"),
            truncate: row.get("can_truncate"),
            references: row.get("can_references"),
            trigger: row.get("can_trigger"),
        };

        if let Some(table) = snapshot.tables.get_mut(&key) {
            table.privileges.insert(role, privileges);
        } else if let Some(view) = snapshot.views.get_mut(&key) {
            view.privileges.insert(role, privileges);
        } else if let Some(view) = snapshot.materialized_views.get_mut(&key) {
            view.privileges.insert(role, privileges);
        }
    }

    Ok(())
}

async fn introspect_views(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<(BTreeMap<String, View>, BTreeMap<String, MaterializedView>)> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, c.relname AS name, c.relkind::text AS kind,
               pg_get_userbyid(c.relowner) AS owner,
               pg_get_viewdef(c.oid) AS definition
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('v', 'm')
          AND n.nspname = ANY($1::text[])
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch views: {e}")))?;

    let mut views = BTreeMap::new();
    let mut materialized_views = BTreeMap::new();
    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        let kind: String = row.get("kind");
        let key = quote_qualified(&schema, &name);
        let owner: String = row.get("owner");
        let definition: String = row.get("definition");

        if kind == "m" {
            materialized_views.insert(
                key,
                MaterializedView {
                    owner,
                    definition,
                    indexes: BTreeMap::new(),
                    privileges: BTreeMap::new(),
                    dependencies: Vec::new(),
                },
            );
        } else {
            views.insert(
                key,
                View {
                    owner,
                    definition,
                    privileges: BTreeMap::new(),
                    dependencies: Vec::new(),
                },
            );
        }
    }

    Ok((views, materialized_views))
}

/// Table columns each view reads, from the view's rewrite rule.
async fn introspect_view_dependencies(
    connection: &PgConnection,
    namespaces: &[String],
    snapshot: &mut SchemaSnapshot,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT vn.nspname AS view_schema, v.relname AS view_name,
               tn.nspname AS schema_name, t.relname AS table_name, a.attname AS column_name
        FROM pg_depend d
        JOIN pg_rewrite r ON r.oid = d.objid
        JOIN pg_class v ON v.oid = r.ev_class
        JOIN pg_namespace vn ON vn.oid = v.relnamespace
        JOIN pg_class t ON t.oid = d.refobjid
        JOIN pg_namespace tn ON tn.oid = t.relnamespace
        JOIN pg_attribute a ON a.attrelid = d.refobjid AND a.attnum = d.refobjsubid
        WHERE d.classid = 'pg_rewrite'::regclass
          AND d.refclassid = 'pg_class'::regclass
          AND d.deptype = 'n'
          AND v.oid <> t.oid
          AND v.relkind IN ('v', 'm')
          AND vn.nspname = ANY($1::text[])
        ORDER BY vn.nspname, v.relname, tn.nspname, t.relname, a.attname
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch view dependencies: {e}")))?;

    for row in rows {
        let view_schema: String = row.get("view_schema");
        let view_name: String = row.get("view_name");
        let key = quote_qualified(&view_schema, &view_name);
        let dependency = ViewDependency {
            schema_name: row.get("schema_name"),
            table_name: row.get("table_name"),
            column_name: row.get("column_name"),
        };

        if let Some(view) = snapshot.views.get_mut(&key) {
            view.dependencies.push(dependency);
        } else if let Some(view) = snapshot.materialized_views.get_mut(&key) {
            view.dependencies.push(dependency);
        }
    }

    Ok(())
}

async fn introspect_functions(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<BTreeMap<String, Function>> {
    // prokind replaced proisagg/proiswindow in PostgreSQL 11
    let plain_function = if connection.server_version() >= 110000 {
        "p.prokind = 'f'"
    } else {
        "NOT p.proisagg AND NOT p.proiswindow"
    };
    let query = format!(
        r#"
        SELECT p.oid::int8 AS oid, n.nspname AS schema, p.proname AS name,
               pg_get_function_identity_arguments(p.oid) AS arg_types,
               pg_get_functiondef(p.oid) AS definition,
               pg_get_userbyid(p.proowner) AS owner
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        WHERE {plain_function}
          AND n.nspname = ANY($1::text[])
        "#
    );
    let rows = sqlx::query(&query)
        .bind(namespaces)
        .fetch_all(connection.pool())
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch functions: {e}")))?;

    let mut functions = BTreeMap::new();
    let mut oids = BTreeMap::new();
    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        let function = Function {
            name: quote_qualified(&schema, &name),
            arg_types: row.get("arg_types"),
            definition: row.get("definition"),
            owner: row.get("owner"),
            privileges: BTreeMap::new(),
        };
        oids.insert(row.get::<i64, _>("oid"), function.signature());
        functions.insert(function.signature(), function);
    }

    let rows = sqlx::query(
        r#"
        SELECT p.oid::int8 AS oid, r.rolname AS role,
               has_function_privilege(r.oid, p.oid, 'EXECUTE') AS can_execute
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        CROSS JOIN pg_roles r
        WHERE n.nspname = ANY($1::text[])
          AND r.rolcanlogin
          AND r.rolname !~ '^pg_'
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| {
        SchemaError::DatabaseError(format!("Failed to fetch function privileges: {e}"))
    })?;

    for row in rows {
        let Some(function) = oids
            .get(&row.get::<i64, _>("oid"))
            .and_then(|signature| functions.get_mut(signature))
        else {
            continue;
        };
        function.privileges.insert(
            row.get("role"),
            FunctionPrivileges {
                execute: row.get("can_execute"),
            },
        );
    }

    Ok(functions)
}

/// Sequences outside identity columns, with the column they are owned by.
async fn introspect_sequences(
    connection: &PgConnection,
    namespaces: &[String],
) -> Result<BTreeMap<String, Sequence>> {
    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, c.relname AS name,
               pg_get_userbyid(c.relowner) AS owner,
               s.seqstart AS start_value, s.seqmin AS min_value, s.seqmax AS max_value,
               s.seqincrement AS increment, s.seqcache AS cache_size, s.seqcycle AS is_cycle,
               tn.nspname AS owned_schema, t.relname AS owned_table, a.attname AS owned_column
        FROM pg_sequence s
        JOIN pg_class c ON c.oid = s.seqrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_depend d ON d.objid = c.oid
             AND d.classid = 'pg_class'::regclass
             AND d.refclassid = 'pg_class'::regclass
             AND d.deptype = 'a'
        LEFT JOIN pg_class t ON t.oid = d.refobjid
        LEFT JOIN pg_namespace tn ON tn.oid = t.relnamespace
        LEFT JOIN pg_attribute a ON a.attrelid = d.refobjid AND a.attnum = d.refobjsubid
        WHERE n.nspname = ANY($1::text[])
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend di
              WHERE di.objid = c.oid
                AND di.classid = 'pg_class'::regclass
                AND di.deptype = 'i'
          )
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch sequences: {e}")))?;

    let mut sequences = BTreeMap::new();
    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        let owned_schema: Option<String> = row.get("owned_schema");
        let owned_table: Option<String> = row.get("owned_table");
        let owned_column: Option<String> = row.get("owned_column");
        let owned_by = match (owned_schema, owned_table, owned_column) {
            (Some(schema), Some(table), Some(column)) => Some(format!(
                "{}.{}",
                quote_qualified(&schema, &table),
                quote_ident(&column)
            )),
            _ => None,
        };

        sequences.insert(
            quote_qualified(&schema, &name),
            Sequence {
                name,
                owned_by,
                start_value: row.get("start_value"),
                min_value: row.get("min_value"),
                max_value: row.get("max_value"),
                increment: row.get("increment"),
                cache_size: row.get("cache_size"),
                is_cycle: row.get("is_cycle"),
                owner: row.get("owner"),
                privileges: BTreeMap::new(),
            },
        );
    }

    let rows = sqlx::query(
        r#"
        SELECT n.nspname AS schema, c.relname AS name, r.rolname AS role,
               has_sequence_privilege(r.oid, c.oid, 'SELECT') AS can_select,
               has_sequence_privilege(r.oid, c.oid, 'USAGE') AS can_usage,
               has_sequence_privilege(r.oid, c.oid, 'UPDATE') AS can_update
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        CROSS JOIN pg_roles r
        WHERE c.relkind = 'S'
          AND n.nspname = ANY($1::text[])
          AND r.rolcanlogin
          AND r.rolname !~ '^pg_'
        "#,
    )
    .bind(namespaces)
    .fetch_all(connection.pool())
    .await
    .map_err(|e| {
        SchemaError::DatabaseError(format!("Failed to fetch sequence privileges: {e}"))
    })?;

    for row in rows {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        if let Some(sequence) = sequences.get_mut(&quote_qualified(&schema, &name)) {
            sequence.privileges.insert(
                row.get("role"),
                SequencePrivileges {
                    select: row.get("can_select"),
                    usage: row.get("can_usage"),
                    update: row.get("can_update"),
                },
            );
        }
    }

    Ok(sequences)
}
