use chrono::Utc;
use medgate_application::{AccessRequestQuery, AccessRequestRepository, AccessRequestSubmission};
use medgate_core::{AppError, UserId};
use medgate_domain::{
    AccessRequest, AccessRequestId, AccessRequestResolution, AccessRequestStatus, Permission,
    PermissionId, PermissionName,
};
use sqlx::PgPool;

use crate::test_database::{insert_user, permission_id, test_pool};

use super::PostgresAccessRequestRepository;

async fn permission(pool: &PgPool, name: &str) -> Permission {
    Permission {
        permission_id: PermissionId::from_uuid(permission_id(pool, name).await),
        name: PermissionName::new(name).unwrap_or_else(|_| panic!("valid permission")),
    }
}

#[tokio::test]
async fn second_submission_returns_existing_pending_request() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessRequestRepository::new(pool.clone());
    let user_id = UserId::from_uuid(insert_user(&pool, "Nurse Joy").await);
    let permission = permission(&pool, "edit_patient").await;

    let first = repository
        .submit_request(AccessRequest::pending(user_id, &permission, Utc::now()))
        .await
        .unwrap_or_else(|error| panic!("first submission should succeed: {error}"));
    assert!(matches!(first, AccessRequestSubmission::Created(_)));

    let second = repository
        .submit_request(AccessRequest::pending(user_id, &permission, Utc::now()))
        .await
        .unwrap_or_else(|error| panic!("second submission should succeed: {error}"));
    assert!(matches!(second, AccessRequestSubmission::AlreadyPending(_)));
    assert_eq!(second.request().request_id, first.request().request_id);

    let pending = repository
        .list_requests(AccessRequestQuery {
            status: Some(AccessRequestStatus::Pending),
            user_id: Some(user_id),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap_or_default();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn resolution_is_terminal_and_allows_a_new_request() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessRequestRepository::new(pool.clone());
    let user_id = UserId::from_uuid(insert_user(&pool, "Dr. Rivera").await);
    let approver = UserId::from_uuid(insert_user(&pool, "Admin Ada").await);
    let permission = permission(&pool, "view_sensitive_data").await;
    let now = Utc::now();

    let submitted = repository
        .submit_request(AccessRequest::pending(user_id, &permission, now))
        .await
        .unwrap_or_else(|error| panic!("submission should succeed: {error}"));
    let request_id = submitted.request().request_id;

    let approved = repository
        .resolve_request(request_id, AccessRequestResolution::Approve, approver, now)
        .await
        .unwrap_or_else(|error| panic!("approval should succeed: {error}"));
    assert_eq!(approved.status, AccessRequestStatus::Approved);
    assert_eq!(approved.approved_by, Some(approver));

    let again = repository
        .resolve_request(request_id, AccessRequestResolution::Deny, approver, now)
        .await;
    assert!(matches!(again, Err(AppError::AlreadyResolved(_))));

    let stored = repository.find_request(request_id).await;
    assert!(stored.is_ok_and(|request| {
        request.is_some_and(|request| request.status == AccessRequestStatus::Approved)
    }));

    let resubmitted = repository
        .submit_request(AccessRequest::pending(user_id, &permission, now))
        .await;
    assert!(matches!(resubmitted, Ok(AccessRequestSubmission::Created(_))));

    let missing = repository
        .resolve_request(
            AccessRequestId::new(),
            AccessRequestResolution::Approve,
            approver,
            now,
        )
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn reopened_request_can_be_approved_again() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccessRequestRepository::new(pool.clone());
    let user_id = UserId::from_uuid(insert_user(&pool, "Dr. Okafor").await);
    let approver = UserId::from_uuid(insert_user(&pool, "Admin Ada").await);
    let permission = permission(&pool, "upload_data").await;
    let now = Utc::now();

    let request_id = repository
        .submit_request(AccessRequest::pending(user_id, &permission, now))
        .await
        .map(|submission| submission.request().request_id)
        .unwrap_or_else(|error| panic!("submission should succeed: {error}"));

    let pending = repository.reopen_request(request_id).await;
    assert!(matches!(pending, Err(AppError::Conflict(_))));

    let approved = repository
        .resolve_request(request_id, AccessRequestResolution::Approve, approver, now)
        .await;
    assert!(approved.is_ok());

    let reopened = repository
        .reopen_request(request_id)
        .await
        .unwrap_or_else(|error| panic!("reopen should succeed: {error}"));
    assert_eq!(reopened.status, AccessRequestStatus::Pending);
    assert_eq!(reopened.approved_by, None);

    let stored = repository.find_request(request_id).await;
    assert!(stored.is_ok_and(|request| {
        request.is_some_and(|request| {
            request.status == AccessRequestStatus::Pending && request.approved_at.is_none()
        })
    }));

    let approved_again = repository
        .resolve_request(request_id, AccessRequestResolution::Approve, approver, now)
        .await;
    assert!(matches!(
        approved_again,
        Ok(ref request) if request.status == AccessRequestStatus::Approved
    ));
}
