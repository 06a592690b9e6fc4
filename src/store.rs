use sqlx::SqlitePool;

use crate::models::{Contact, NewContact, UpdateContactRequest};

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Contact),
    /// A row with the same name, email and phone already exists.
    Duplicate(Contact),
}

/// Data access for the `contact` table.
///
/// Every mutation is one statement that writes first, so it runs in its own
/// implicit transaction and is rolled back as a whole if it fails. A write
/// must never follow a read in the same transaction.
#[derive(Debug, Clone)]
pub struct ContactStore {
    pool: SqlitePool,
}

impl ContactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>("SELECT id, name, email, phone FROM contact ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>("SELECT id, name, email, phone FROM contact WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create(&self, new_contact: &NewContact) -> Result<CreateOutcome, sqlx::Error> {
        loop {
            let inserted = sqlx::query_as::<_, Contact>(
                "INSERT INTO contact (name, email, phone) \
                 SELECT ?, ?, ? WHERE NOT EXISTS \
                 (SELECT 1 FROM contact WHERE name = ? AND email = ? AND phone = ?) \
                 RETURNING id, name, email, phone",
            )
            .bind(&new_contact.name)
            .bind(&new_contact.email)
            .bind(&new_contact.phone)
            .bind(&new_contact.name)
            .bind(&new_contact.email)
            .bind(&new_contact.phone)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(contact) = inserted {
                return Ok(CreateOutcome::Created(contact));
            }

            // The duplicate may have been deleted since the insert was skipped.
            if let Some(existing) = self.find_duplicate(new_contact).await? {
                return Ok(CreateOutcome::Duplicate(existing));
            }
        }
    }

    async fn find_duplicate(&self, contact: &NewContact) -> Result<Option<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "SELECT id, name, email, phone FROM contact \
             WHERE name = ? AND email = ? AND phone = ? ORDER BY id LIMIT 1",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .fetch_optional(&self.pool)
        .await
    }

    /// Overwrites the fields present in `changes`. `Ok(None)` when no
    /// contact has this id.
    pub async fn update(
        &self,
        id: i64,
        changes: UpdateContactRequest,
    ) -> Result<Option<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "UPDATE contact SET \
             name = COALESCE(?, name), \
             email = COALESCE(?, email), \
             phone = COALESCE(?, phone) \
             WHERE id = ? \
             RETURNING id, name, email, phone",
        )
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.phone)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Returns the deleted row, or `Ok(None)` when no contact has this id.
    pub async fn delete(&self, id: i64) -> Result<Option<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "DELETE FROM contact WHERE id = ? RETURNING id, name, email, phone",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    use std::collections::HashSet;

    async fn store() -> ContactStore {
        let pool = db::connect_in_memory().await.unwrap();
        db::ensure_schema(&pool).await.unwrap();
        ContactStore::new(pool)
    }

    fn ada() -> NewContact {
        NewContact {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "5550001".into(),
        }
    }

    async fn created(store: &ContactStore, new_contact: &NewContact) -> Contact {
        match store.create(new_contact).await.unwrap() {
            CreateOutcome::Created(contact) => contact,
            CreateOutcome::Duplicate(existing) => panic!("unexpected duplicate: {existing:?}"),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids() {
        let store = store().await;

        let first = created(&store, &ada()).await;
        let second = created(
            &store,
            &NewContact {
                name: "Grace".into(),
                email: "grace@example.com".into(),
                phone: "5550002".into(),
            },
        )
        .await;

        assert!(second.id > first.id);
        assert_eq!(store.find(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn duplicate_triple_is_not_inserted() {
        let store = store().await;
        let original = created(&store, &ada()).await;

        match store.create(&ada()).await.unwrap() {
            CreateOutcome::Duplicate(existing) => assert_eq!(existing, original),
            CreateOutcome::Created(contact) => panic!("duplicate was inserted: {contact:?}"),
        }
        assert_eq!(store.list().await.unwrap().len(), 1);

        // Same name and email with a different phone is a distinct contact.
        let other_phone = NewContact {
            phone: "5550003".into(),
            ..ada()
        };
        created(&store, &other_phone).await;
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_persists() {
        let store = store().await;
        let contact = created(&store, &ada()).await;

        let changes = UpdateContactRequest {
            email: Some("ada@lovelace.org".into()),
            ..Default::default()
        };
        let updated = store.update(contact.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.email, "ada@lovelace.org");
        assert_eq!(updated.name, "Ada");

        assert_eq!(store.find(contact.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn missing_rows_report_none() {
        let store = store().await;

        assert_eq!(store.find(42).await.unwrap(), None);
        assert_eq!(
            store
                .update(42, UpdateContactRequest::default())
                .await
                .unwrap(),
            None
        );
        assert_eq!(store.delete(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = store().await;
        let contact = created(&store, &ada()).await;

        assert_eq!(store.delete(contact.id).await.unwrap(), Some(contact.clone()));
        assert_eq!(store.find(contact.id).await.unwrap(), None);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_update_keeps_omitted_fields() {
        let store = store().await;
        let contact = created(&store, &ada()).await;

        let changes = UpdateContactRequest {
            phone: Some("5559999".into()),
            ..Default::default()
        };
        let updated = store.update(contact.id, changes).await.unwrap().unwrap();
        assert_eq!(
            updated,
            Contact {
                phone: "5559999".into(),
                ..contact.clone()
            }
        );

        let untouched = store
            .update(contact.id, UpdateContactRequest::default())
            .await
            .unwrap();
        assert_eq!(untouched, Some(updated));
    }

    #[tokio::test]
    async fn concurrent_writes_on_a_file_database_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("contacts.db").display());
        let pool = db::connect(&url, 8).await.unwrap();
        db::ensure_schema(&pool).await.unwrap();
        let store = ContactStore::new(pool);

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let new_contact = NewContact {
                        name: format!("Contact {i}"),
                        email: format!("contact{i}@example.com"),
                        phone: format!("555{i:04}"),
                    };
                    let contact = match store.create(&new_contact).await? {
                        CreateOutcome::Created(contact) => contact,
                        CreateOutcome::Duplicate(existing) => existing,
                    };
                    let changes = UpdateContactRequest {
                        phone: Some(format!("556{i:04}")),
                        ..Default::default()
                    };
                    store.update(contact.id, changes).await?;
                    if i % 2 == 0 {
                        store.delete(contact.id).await?;
                    }
                    Ok::<_, sqlx::Error>(())
                })
            })
            .collect();

        for task in tasks {
            if let Err(err) = task.await.unwrap() {
                panic!("concurrent write failed: {err}");
            }
        }

        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 32);
        assert!(remaining.iter().all(|c| c.phone.starts_with("556")));
        let ids: HashSet<i64> = remaining.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_insert_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("contacts.db").display());
        let pool = db::connect(&url, 8).await.unwrap();
        db::ensure_schema(&pool).await.unwrap();
        let store = ContactStore::new(pool);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(&ada()).await })
            })
            .collect();

        let mut created_count = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(CreateOutcome::Created(_)) => created_count += 1,
                Ok(CreateOutcome::Duplicate(_)) => {}
                Err(err) => panic!("concurrent create failed: {err}"),
            }
        }

        assert_eq!(created_count, 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
