use super::{BriefingService, RunReport};
use crate::errors::AppResult;
use crate::telegram::dispatch_all;
use crate::types::{Dialect, RecipientEndpoint};
use tracing::{info, warn};

/// Build today's digest and send it to every opted-in user.
///
/// Feed and delivery failures are folded into the report; only a failed
/// directory lookup aborts the run.
pub async fn send_briefing_now(service: &BriefingService) -> AppResult<RunReport> {
    info!("Running daily briefing");

    let (digest, recipients) = tokio::join!(
        service.build_digest(Dialect::Html),
        service.directory().opted_in_recipients()
    );
    let recipients = recipients?;

    if recipients.is_empty() {
        info!("No Telegram users to send briefing to");
        return Ok(RunReport::default());
    }
    info!(recipients = recipients.len(), "Sending briefing");

    let endpoints: Vec<RecipientEndpoint> = recipients.iter().map(|r| r.endpoint.clone()).collect();
    let outcomes = dispatch_all(service.telegram(), &endpoints, &digest, Dialect::Html).await;
    let report = RunReport::from_outcomes(&outcomes);

    for failure in &report.failures {
        warn!(
            chat_id = %failure.chat_id,
            error = failure.error.as_deref().unwrap_or("unknown error"),
            "Briefing delivery failed"
        );
    }
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "{}",
        report.summary()
    );

    Ok(report)
}
