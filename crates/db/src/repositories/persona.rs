use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};

use danswer_core::domain::persona::{
    ensure_updatable, DocumentSet, Persona, PersonaId, PersonaUpsert,
    SLACK_BOT_PERSONA_PREFIX,
};
use danswer_core::errors::DomainError;

use super::document_set::row_to_document_set;
use super::{PersonaRepository, RepositoryError};
use crate::DbPool;

const PERSONA_COLUMNS: &str = "id, name, description, system_text, hint_text, num_chunks,
     apply_llm_relevance_filter, llm_model_version_override, retrieval_enabled,
     datetime_aware, default_persona, deleted";

pub struct SqlPersonaRepository {
    pool: DbPool,
}

impl SqlPersonaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn document_sets_for(&self, id: PersonaId) -> Result<Vec<DocumentSet>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT ds.id, ds.name, ds.description
             FROM document_set ds
             JOIN persona__document_set pds ON pds.document_set_id = ds.id
             WHERE pds.persona_id = ?
             ORDER BY ds.id ASC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document_set).collect()
    }
}

/// Decodes the persona row itself; document sets are attached by the caller.
fn row_to_persona(row: &sqlx::sqlite::SqliteRow) -> Result<Persona, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    Ok(Persona {
        id: PersonaId(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        system_prompt: row.try_get("system_text").map_err(decode)?,
        task_prompt: row.try_get("hint_text").map_err(decode)?,
        num_chunks: row.try_get("num_chunks").map_err(decode)?,
        apply_llm_relevance_filter: row.try_get("apply_llm_relevance_filter").map_err(decode)?,
        llm_model_version_override: row.try_get("llm_model_version_override").map_err(decode)?,
        retrieval_enabled: row.try_get("retrieval_enabled").map_err(decode)?,
        datetime_aware: row.try_get("datetime_aware").map_err(decode)?,
        default_persona: row.try_get("default_persona").map_err(decode)?,
        deleted: row.try_get("deleted").map_err(decode)?,
        document_sets: Vec::new(),
    })
}

/// Writes `upsert` inside the caller's transaction and returns the persona id.
pub(crate) async fn upsert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    upsert: &PersonaUpsert,
) -> Result<PersonaId, RepositoryError> {
    upsert.validate()?;

    if let Some(persona_id) = upsert.persona_id {
        let row = sqlx::query(&format!("SELECT {PERSONA_COLUMNS} FROM persona WHERE id = ?"))
            .bind(persona_id.0)
            .fetch_optional(&mut **tx)
            .await?;
        let existing = match row {
            Some(ref row) => row_to_persona(row)?,
            None => {
                return Err(DomainError::InvalidPersona(format!(
                    "Persona with ID {} does not exist",
                    persona_id.0
                ))
                .into())
            }
        };
        ensure_updatable(&existing)?;
    }

    // Generated names can collide across channel sets; only user-named
    // personas have to be unique.
    let name_taken: Option<i64> = if upsert.name.starts_with(SLACK_BOT_PERSONA_PREFIX) {
        None
    } else {
        sqlx::query_scalar(
            "SELECT id FROM persona WHERE name = ? AND deleted = 0 AND id != ? LIMIT 1",
        )
        .bind(&upsert.name)
        .bind(upsert.persona_id.map(|id| id.0).unwrap_or(-1))
        .fetch_optional(&mut **tx)
        .await?
    };
    if name_taken.is_some() {
        return Err(DomainError::InvalidPersona(format!(
            "A persona named `{}` already exists",
            upsert.name
        ))
        .into());
    }

    for document_set_id in &upsert.document_set_ids {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM document_set WHERE id = ?")
            .bind(document_set_id.0)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(DomainError::UnknownDocumentSet(document_set_id.0).into());
        }
    }

    let now = Utc::now().to_rfc3339();
    let persona_id = match upsert.persona_id {
        Some(persona_id) => {
            sqlx::query(
                "UPDATE persona SET
                     name = ?, description = ?, system_text = ?, hint_text = ?,
                     num_chunks = ?, apply_llm_relevance_filter = ?,
                     llm_model_version_override = ?, retrieval_enabled = ?,
                     datetime_aware = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&upsert.name)
            .bind(&upsert.description)
            .bind(&upsert.system_prompt)
            .bind(&upsert.task_prompt)
            .bind(upsert.num_chunks)
            .bind(upsert.apply_llm_relevance_filter)
            .bind(&upsert.llm_model_version_override)
            .bind(upsert.retrieval_enabled)
            .bind(upsert.datetime_aware)
            .bind(&now)
            .bind(persona_id.0)
            .execute(&mut **tx)
            .await?;

            sqlx::query("DELETE FROM persona__document_set WHERE persona_id = ?")
                .bind(persona_id.0)
                .execute(&mut **tx)
                .await?;
            persona_id
        }
        None => {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO persona (name, description, system_text, hint_text, num_chunks,
                                      apply_llm_relevance_filter, llm_model_version_override,
                                      retrieval_enabled, datetime_aware, default_persona,
                                      deleted, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
                 RETURNING id",
            )
            .bind(&upsert.name)
            .bind(&upsert.description)
            .bind(&upsert.system_prompt)
            .bind(&upsert.task_prompt)
            .bind(upsert.num_chunks)
            .bind(upsert.apply_llm_relevance_filter)
            .bind(&upsert.llm_model_version_override)
            .bind(upsert.retrieval_enabled)
            .bind(upsert.datetime_aware)
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut **tx)
            .await?;
            PersonaId(id)
        }
    };

    for document_set_id in &upsert.document_set_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO persona__document_set (persona_id, document_set_id)
             VALUES (?, ?)",
        )
        .bind(persona_id.0)
        .bind(document_set_id.0)
        .execute(&mut **tx)
        .await?;
    }

    Ok(persona_id)
}

#[async_trait::async_trait]
impl PersonaRepository for SqlPersonaRepository {
    async fn upsert(&self, upsert: PersonaUpsert) -> Result<Persona, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let persona_id = upsert_in_tx(&mut tx, &upsert).await?;
        tx.commit().await?;

        self.find_by_id(persona_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("persona {} vanished after upsert", persona_id.0))
        })
    }

    async fn find_by_id(&self, id: PersonaId) -> Result<Option<Persona>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PERSONA_COLUMNS} FROM persona WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let mut persona = match row {
            Some(ref row) => row_to_persona(row)?,
            None => return Ok(None),
        };
        persona.document_sets = self.document_sets_for(persona.id).await?;
        Ok(Some(persona))
    }

    async fn list(
        &self,
        include_slack_bot_personas: bool,
    ) -> Result<Vec<Persona>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PERSONA_COLUMNS} FROM persona WHERE deleted = 0 ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut personas = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut persona = row_to_persona(row)?;
            if !include_slack_bot_personas && persona.name.starts_with(SLACK_BOT_PERSONA_PREFIX) {
                continue;
            }
            persona.document_sets = self.document_sets_for(persona.id).await?;
            personas.push(persona);
        }
        Ok(personas)
    }

    async fn mark_deleted(&self, id: PersonaId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE persona SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
                .bind(Utc::now().to_rfc3339())
                .bind(id.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: PersonaId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM persona WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use danswer_core::domain::persona::{DocumentSetId, Persona, PersonaId, PersonaUpsert};
    use danswer_core::errors::DomainError;

    use super::SqlPersonaRepository;
    use crate::repositories::{
        DocumentSetRepository, PersonaRepository, RepositoryError, SqlDocumentSetRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn document_set_ids(persona: &Persona) -> Vec<DocumentSetId> {
        persona.document_sets.iter().map(|set| set.id).collect()
    }

    fn sample_upsert(name: &str) -> PersonaUpsert {
        PersonaUpsert {
            persona_id: None,
            name: name.to_string(),
            description: "Answers engineering questions".to_string(),
            system_prompt: "You are a helpful engineering assistant.".to_string(),
            task_prompt: "Cite the documents you used.".to_string(),
            num_chunks: Some(10.0),
            apply_llm_relevance_filter: false,
            llm_model_version_override: Some("gpt-4".to_string()),
            retrieval_enabled: true,
            datetime_aware: true,
            document_set_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips_fields_and_document_sets() {
        let pool = setup().await;
        let sets = SqlDocumentSetRepository::new(pool.clone());
        let handbook = sets.insert("Handbook", "").await.expect("insert set");
        let repo = SqlPersonaRepository::new(pool);

        let created = repo
            .upsert(PersonaUpsert { document_set_ids: vec![handbook.id], ..sample_upsert("Eng") })
            .await
            .expect("create");

        let fetched = repo.find_by_id(created.id).await.expect("find").expect("exists");
        assert_eq!(fetched, created);
        assert_eq!(fetched.task_prompt, "Cite the documents you used.");
        assert_eq!(fetched.llm_model_version_override.as_deref(), Some("gpt-4"));
        assert_eq!(document_set_ids(&fetched), vec![handbook.id]);
        assert!(!fetched.deleted);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_document_sets() {
        let pool = setup().await;
        let sets = SqlDocumentSetRepository::new(pool.clone());
        let first = sets.insert("First", "").await.expect("insert set");
        let second = sets.insert("Second", "").await.expect("insert set");
        let repo = SqlPersonaRepository::new(pool);

        let created = repo
            .upsert(PersonaUpsert { document_set_ids: vec![first.id], ..sample_upsert("Eng") })
            .await
            .expect("create");

        let updated = repo
            .upsert(PersonaUpsert {
                persona_id: Some(created.id),
                num_chunks: None,
                document_set_ids: vec![second.id],
                ..sample_upsert("Engineering")
            })
            .await
            .expect("update");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Engineering");
        assert_eq!(updated.num_chunks, None);
        assert_eq!(document_set_ids(&updated), vec![second.id]);
    }

    #[tokio::test]
    async fn updating_missing_or_deleted_persona_fails_validation() {
        let repo = SqlPersonaRepository::new(setup().await);

        let missing = repo
            .upsert(PersonaUpsert { persona_id: Some(PersonaId(42)), ..sample_upsert("Ghost") })
            .await;
        assert!(matches!(
            missing,
            Err(RepositoryError::Domain(DomainError::InvalidPersona(message))) if message.contains("does not exist")
        ));

        let created = repo.upsert(sample_upsert("Eng")).await.expect("create");
        assert!(repo.mark_deleted(created.id).await.expect("delete"));
        let deleted = repo
            .upsert(PersonaUpsert { persona_id: Some(created.id), ..sample_upsert("Eng") })
            .await;
        assert!(matches!(deleted, Err(RepositoryError::Domain(DomainError::InvalidPersona(_)))));
    }

    #[tokio::test]
    async fn duplicate_live_name_and_unknown_document_set_are_rejected() {
        let repo = SqlPersonaRepository::new(setup().await);
        repo.upsert(sample_upsert("Eng")).await.expect("create");

        let duplicate = repo.upsert(sample_upsert("Eng")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Domain(DomainError::InvalidPersona(_)))));

        let unknown_set = repo
            .upsert(PersonaUpsert {
                document_set_ids: vec![DocumentSetId(77)],
                ..sample_upsert("Other")
            })
            .await;
        assert!(matches!(
            unknown_set,
            Err(RepositoryError::Domain(DomainError::UnknownDocumentSet(77)))
        ));
    }

    #[tokio::test]
    async fn generated_slack_bot_persona_names_may_collide() {
        let repo = SqlPersonaRepository::new(setup().await);
        let first = repo
            .upsert(PersonaUpsert::for_slack_bot(
                &["a-b".to_string(), "c".to_string()],
                Vec::new(),
                None,
            ))
            .await
            .expect("first generated persona");
        let second = repo
            .upsert(PersonaUpsert::for_slack_bot(
                &["a".to_string(), "b-c".to_string()],
                Vec::new(),
                None,
            ))
            .await
            .expect("second generated persona with the same name");

        assert_eq!(first.name, second.name);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn list_skips_deleted_and_optionally_slack_bot_personas() {
        let repo = SqlPersonaRepository::new(setup().await);
        let kept = repo.upsert(sample_upsert("Eng")).await.expect("create");
        let removed = repo.upsert(sample_upsert("Old")).await.expect("create");
        repo.upsert(PersonaUpsert::for_slack_bot(&["support".to_string()], Vec::new(), None))
            .await
            .expect("create slack persona");

        assert!(repo.mark_deleted(removed.id).await.expect("delete"));
        assert!(!repo.mark_deleted(removed.id).await.expect("second delete is a no-op"));

        let public = repo.list(false).await.expect("list");
        assert_eq!(public.iter().map(|p| p.id).collect::<Vec<_>>(), vec![kept.id]);

        let all = repo.list(true).await.expect("list all");
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.is_slack_bot_persona()));

        let still_there = repo.find_by_id(removed.id).await.expect("find").expect("soft deleted");
        assert!(still_there.deleted);
    }

    #[tokio::test]
    async fn deleted_persona_name_can_be_reused() {
        let repo = SqlPersonaRepository::new(setup().await);
        let first = repo.upsert(sample_upsert("Eng")).await.expect("create");
        repo.mark_deleted(first.id).await.expect("delete");

        let second = repo.upsert(sample_upsert("Eng")).await.expect("reuse name");
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn hard_delete_removes_row_and_document_set_links() {
        let pool = setup().await;
        let sets = SqlDocumentSetRepository::new(pool.clone());
        let handbook = sets.insert("Handbook", "").await.expect("insert set");
        let repo = SqlPersonaRepository::new(pool.clone());
        let created = repo
            .upsert(PersonaUpsert { document_set_ids: vec![handbook.id], ..sample_upsert("Eng") })
            .await
            .expect("create");

        assert!(repo.delete(created.id).await.expect("delete"));
        assert!(repo.find_by_id(created.id).await.expect("find").is_none());
        assert!(!repo.delete(created.id).await.expect("second delete"));

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM persona__document_set")
            .fetch_one(&pool)
            .await
            .expect("count links");
        assert_eq!(links, 0);
    }
}
