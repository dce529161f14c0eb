use medgate_application::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
use medgate_core::UserId;
use medgate_domain::AuditAction;

use crate::PostgresAuditRepository;
use crate::test_database::{insert_user, test_pool};

use super::PostgresAuditLogRepository;

#[tokio::test]
async fn appended_events_are_listed_newest_first_and_filterable() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let writer = PostgresAuditRepository::new(pool.clone());
    let reader = PostgresAuditLogRepository::new(pool.clone());
    let actor = UserId::from_uuid(insert_user(&pool, "Auditor Ava").await);

    for (action, resource_id) in [
        (AuditAction::CreateRole, "role-1"),
        (AuditAction::EditRole, "role-1"),
    ] {
        let appended = writer
            .append_event(AuditEvent {
                actor: Some(actor),
                action,
                resource_type: "role".to_owned(),
                resource_id: resource_id.to_owned(),
                detail: Some(format!("{} role-1", action.as_str())),
            })
            .await;
        assert!(appended.is_ok());
    }

    let entries = reader
        .list_recent_entries(AuditLogQuery {
            limit: 10,
            offset: 0,
            action: None,
            actor: Some(actor),
        })
        .await
        .unwrap_or_default();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "EDIT_ROLE");
    assert_eq!(entries[0].actor_display_name.as_deref(), Some("Auditor Ava"));

    let filtered = reader
        .list_recent_entries(AuditLogQuery {
            limit: 10,
            offset: 0,
            action: Some("CREATE_ROLE".to_owned()),
            actor: Some(actor),
        })
        .await
        .unwrap_or_default();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn system_events_have_no_actor() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let writer = PostgresAuditRepository::new(pool.clone());
    let appended = writer
        .append_event(AuditEvent {
            actor: None,
            action: AuditAction::GenerateTempCode,
            resource_type: "temporary_access_code".to_owned(),
            resource_id: uuid::Uuid::new_v4().to_string(),
            detail: None,
        })
        .await;
    assert!(appended.is_ok());
}
