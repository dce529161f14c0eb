use std::convert::Infallible;

use axum::extract::{Extension, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use medgate_application::{NotificationChannel, SessionContext};
use medgate_domain::SystemPermission;
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

/// Server-sent event stream of the caller's notifications.
///
/// Every user hears their own channel. Approvers also hear the approvers group.
pub async fn notification_stream_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut channels = vec![NotificationChannel::User(context.user_id())];
    if state
        .authorization_service
        .has_permission(
            &context,
            SystemPermission::ManageAccessRequests.as_str(),
        )
        .await?
    {
        channels.push(NotificationChannel::approvers());
    }

    let stream = state
        .notification_hub
        .subscribe(&channels)
        .filter_map(|event| async move {
            match Event::default().event(event.event_name()).json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(error) => {
                    warn!(error = %error, "failed to encode notification event");
                    None
                }
            }
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
