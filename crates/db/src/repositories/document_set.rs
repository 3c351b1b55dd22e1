use chrono::Utc;
use sqlx::{QueryBuilder, Row};

use danswer_core::domain::persona::{DocumentSet, DocumentSetId};

use super::{DocumentSetRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDocumentSetRepository {
    pool: DbPool,
}

impl SqlDocumentSetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_document_set(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<DocumentSet, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(DocumentSet { id: DocumentSetId(id), name, description })
}

#[async_trait::async_trait]
impl DocumentSetRepository for SqlDocumentSetRepository {
    async fn insert(&self, name: &str, description: &str) -> Result<DocumentSet, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO document_set (name, description, created_at) VALUES (?, ?, ?)
             RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(DocumentSet {
            id: DocumentSetId(id),
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    async fn find_by_ids(
        &self,
        ids: &[DocumentSetId],
    ) -> Result<Vec<DocumentSet>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::new("SELECT id, name, description FROM document_set WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document_set).collect()
    }

    async fn list(&self) -> Result<Vec<DocumentSet>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, description FROM document_set ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_document_set).collect()
    }
}

#[cfg(test)]
mod tests {
    use danswer_core::domain::persona::DocumentSetId;

    use super::SqlDocumentSetRepository;
    use crate::repositories::DocumentSetRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn find_by_ids_returns_only_existing_sets() {
        let repo = SqlDocumentSetRepository::new(setup().await);
        let handbook = repo.insert("Handbook", "HR policies").await.expect("insert");
        let runbooks = repo.insert("Runbooks", "").await.expect("insert");

        let found = repo
            .find_by_ids(&[runbooks.id, DocumentSetId(999), handbook.id])
            .await
            .expect("find");

        assert_eq!(found, vec![handbook, runbooks]);
        assert!(repo.find_by_ids(&[]).await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_by_the_schema() {
        let repo = SqlDocumentSetRepository::new(setup().await);
        repo.insert("Handbook", "").await.expect("insert");
        assert!(repo.insert("Handbook", "again").await.is_err());
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }
}
