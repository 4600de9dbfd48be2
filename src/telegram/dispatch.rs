use super::client::TelegramClient;
use crate::types::{DeliveryOutcome, Dialect, RecipientEndpoint};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

/// Send `message` to every endpoint at once and wait for all of them.
///
/// Each delivery runs as its own task and gets exactly one attempt; a failing
/// or panicking delivery becomes a failed outcome for that endpoint only. The
/// result holds one outcome per endpoint, in input order.
pub async fn dispatch_all(
    client: &TelegramClient,
    endpoints: &[RecipientEndpoint],
    message: &str,
    dialect: Dialect,
) -> Vec<DeliveryOutcome> {
    let message: Arc<str> = Arc::from(message);

    let handles: Vec<_> = endpoints
        .iter()
        .cloned()
        .map(|endpoint| {
            let client = client.clone();
            let message = Arc::clone(&message);
            tokio::spawn(async move { client.deliver(&endpoint, &message, dialect).await })
        })
        .collect();

    let outcomes: Vec<DeliveryOutcome> = join_all(handles)
        .await
        .into_iter()
        .zip(endpoints)
        .map(|(joined, endpoint)| match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(chat_id = %endpoint.chat_id, error = %e, "Delivery task aborted");
                DeliveryOutcome::failed(&endpoint.chat_id, "Delivery task aborted")
            }
        })
        .collect();

    let delivered = outcomes.iter().filter(|o| o.success).count();
    info!(
        recipients = endpoints.len(),
        delivered,
        failed = outcomes.len() - delivered,
        "Dispatch completed"
    );
    outcomes
}
