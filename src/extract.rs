//! Text extraction from tabular sources
//!
//! Both sources yield the values of one named text column. Missing, empty and
//! whitespace-only cells are dropped rather than reported.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::Connection;
use sqlx::SqliteConnection;
use tracing::debug;
use tracing::info;

use crate::errors::Result;
use crate::errors::TableRagError;

/// Where the text units come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractSource {
    /// Delimited file with a header row
    Csv { path: PathBuf, column: String },
    /// Table in a SQLite database file
    Sqlite {
        path: PathBuf,
        table: String,
        column: String,
    },
}

impl ExtractSource {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Csv { column, .. } | Self::Sqlite { column, .. } => column,
        }
    }
}

/// Read every non-empty value of the source's text column, in row order
pub async fn extract(source: &ExtractSource) -> Result<Vec<String>> {
    let texts = match source {
        ExtractSource::Csv { path, column } => extract_csv(path, column)?,
        ExtractSource::Sqlite {
            path,
            table,
            column,
        } => extract_sqlite(path, table, column).await?,
    };
    info!("Extracted {} text units from column '{}'", texts.len(), source.column());
    Ok(texts)
}

fn keep(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn extract_csv(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableRagError::Extraction(format!("{}: {e}", path.display())))?;

    let position = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| {
            TableRagError::Extraction(format!(
                "column '{column}' not found in {}",
                path.display()
            ))
        })?;

    let mut texts = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        match keep(record?.get(position)) {
            Some(text) => texts.push(text),
            None => dropped += 1,
        }
    }

    debug!("Dropped {} empty rows from {}", dropped, path.display());
    Ok(texts)
}

/// Double-quoted SQL identifier
fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

async fn extract_sqlite(path: &Path, table: &str, column: &str) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(TableRagError::Extraction(format!(
            "database file {} does not exist",
            path.display()
        )));
    }

    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| TableRagError::Extraction(format!("{}: {e}", path.display())))?;

    let table_exists: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
    )
    .bind(table)
    .fetch_optional(&mut conn)
    .await?;
    if table_exists.is_none() {
        return Err(TableRagError::Extraction(format!(
            "table '{table}' not found in {}",
            path.display()
        )));
    }

    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(&mut conn)
        .await?;
    if !columns.iter().any(|c| c == column) {
        return Err(TableRagError::Extraction(format!(
            "column '{column}' not found in table '{table}'"
        )));
    }

    // Numeric cells come back as text
    let values: Vec<Option<String>> = sqlx::query_scalar(&format!(
        "SELECT CAST({col} AS TEXT) FROM {tbl}",
        col = quote_ident(column),
        tbl = quote_ident(table)
    ))
    .fetch_all(&mut conn)
    .await?;
    conn.close().await?;

    let total = values.len();
    let texts: Vec<String> = values.into_iter().filter_map(|v| keep(v.as_deref())).collect();
    debug!("Dropped {} empty rows from table '{}'", total - texts.len(), table);
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use tempfile::TempDir;

    use super::*;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    async fn sqlite_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("products.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query("CREATE TABLE inventory (id INTEGER, description TEXT, stock INTEGER)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO inventory VALUES (1, 'The red shoe sells well', 12), (2, NULL, 3), (3, '  ', 0), (4, 'The blue shoe is discontinued', 7)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_csv_drops_missing_and_blank_cells() {
        let file = csv_file(
            "id,description\n1,The red shoe sells well\n2,\n3,   \n4\n5,\"The blue shoe, discontinued\"\n",
        );
        let source = ExtractSource::Csv {
            path: file.path().to_path_buf(),
            column: "description".to_string(),
        };

        let texts = extract(&source).await.unwrap();
        assert_eq!(
            texts,
            vec!["The red shoe sells well", "The blue shoe, discontinued"]
        );
    }

    #[tokio::test]
    async fn test_csv_missing_column_is_extraction_error() {
        let file = csv_file("id,name\n1,shoe\n");
        let source = ExtractSource::Csv {
            path: file.path().to_path_buf(),
            column: "description".to_string(),
        };

        let err = extract(&source).await.unwrap_err();
        assert!(matches!(err, TableRagError::Extraction(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_csv_missing_file_is_extraction_error() {
        let source = ExtractSource::Csv {
            path: PathBuf::from("/nonexistent/products.csv"),
            column: "description".to_string(),
        };
        assert!(matches!(
            extract(&source).await,
            Err(TableRagError::Extraction(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_extracts_text_column() {
        let dir = TempDir::new().unwrap();
        let path = sqlite_fixture(&dir).await;

        let texts = extract(&ExtractSource::Sqlite {
            path: path.clone(),
            table: "inventory".to_string(),
            column: "description".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(
            texts,
            vec!["The red shoe sells well", "The blue shoe is discontinued"]
        );

        let stock = extract(&ExtractSource::Sqlite {
            path,
            table: "inventory".to_string(),
            column: "stock".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(stock, vec!["12", "3", "0", "7"]);
    }

    #[tokio::test]
    async fn test_sqlite_missing_table_or_column() {
        let dir = TempDir::new().unwrap();
        let path = sqlite_fixture(&dir).await;

        let missing_table = extract(&ExtractSource::Sqlite {
            path: path.clone(),
            table: "orders".to_string(),
            column: "description".to_string(),
        })
        .await;
        assert!(matches!(missing_table, Err(TableRagError::Extraction(_))));

        let missing_column = extract(&ExtractSource::Sqlite {
            path,
            table: "inventory".to_string(),
            column: "notes".to_string(),
        })
        .await;
        assert!(matches!(missing_column, Err(TableRagError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_sqlite_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = extract(&ExtractSource::Sqlite {
            path: dir.path().join("absent.db"),
            table: "inventory".to_string(),
            column: "description".to_string(),
        })
        .await;
        assert!(matches!(result, Err(TableRagError::Extraction(_))));
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("description"), "\"description\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
