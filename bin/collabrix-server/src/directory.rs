//! Directory snapshot: the reference entities flattened into prompt text.

use collabrix_types::{DirectorySource, render_snapshot};

use crate::entities::{SupplierStore, UserStore};

/// Read up to `limit` entities of `source` in store order (`0` reads all)
/// and render one `key: value, ...` line per entity.
pub async fn build_snapshot<S>(
    store: &S,
    source: DirectorySource,
    limit: usize,
) -> Result<String, sqlx::Error>
where
    S: UserStore + SupplierStore,
{
    let snapshot = match source {
        DirectorySource::Users => {
            let users: Vec<_> = store
                .list_directory_users(limit)
                .await?
                .iter()
                .map(|u| u.to_directory_user())
                .collect();
            render_snapshot(&users)
        }
        DirectorySource::Suppliers => render_snapshot(&store.list_suppliers(limit).await?),
    };
    tracing::debug!(source = %source, bytes = snapshot.len(), "built directory snapshot");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::entities::user::tests::sample_user;
    use collabrix_types::Supplier;

    #[tokio::test]
    async fn users_snapshot_projects_public_fields() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let mut alice = sample_user("alice");
        alice.business_name = Some("Alice Farms".into());
        alice.location = Some("Accra".into());
        alice.points = 12.0;
        store.create_user(alice).await.unwrap();
        store.create_user(sample_user("bob")).await.unwrap();

        let snapshot = build_snapshot(&store, DirectorySource::Users, 10).await.unwrap();
        assert_eq!(
            snapshot,
            "username: alice, businessName: Alice Farms, location: Accra, points: 12, tier: 1\n\
             username: bob"
        );
        assert!(!snapshot.contains("example.com"));
    }

    #[tokio::test]
    async fn snapshot_respects_limit_and_source() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        for name in ["a", "b", "c"] {
            store.create_user(sample_user(name)).await.unwrap();
        }
        store
            .insert_supplier(Supplier {
                id: "s1".into(),
                name: "Agro Hub".into(),
                location: "Ibadan".into(),
                supplies: vec!["tools".into(), "seeds".into()],
            })
            .await
            .unwrap();

        let users = build_snapshot(&store, DirectorySource::Users, 2).await.unwrap();
        assert_eq!(users.lines().count(), 2);
        let everyone = build_snapshot(&store, DirectorySource::Users, 0).await.unwrap();
        assert_eq!(everyone.lines().count(), 3);

        let suppliers = build_snapshot(&store, DirectorySource::Suppliers, 10).await.unwrap();
        assert_eq!(suppliers, "name: Agro Hub, location: Ibadan, supplies: tools, seeds");
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_snapshot() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let snapshot = build_snapshot(&store, DirectorySource::Suppliers, 10).await.unwrap();
        assert!(snapshot.is_empty());
    }
}
