//! Submit command implementation.

use crate::cli::SubmitArgs;
use crate::error::Result;
use rapport_domain::DeliveryLedger;
use rapport_protocol::ActionMessage;

/// Validate the action and enqueue it; returns the message id.
pub fn execute_submit<S>(args: SubmitArgs, queue: &S) -> Result<String>
where
    S: DeliveryLedger<Error = rapport_store::StoreError>,
{
    let message = ActionMessage::new(args.player, args.friend, args.action.into());
    message.validate()?;

    let message_id = queue.enqueue(&message.to_json()?)?;
    tracing::info!(
        "queued {} from {} to {} as {}",
        message.friend_action,
        message.player_id,
        message.friend_id,
        message_id
    );

    Ok(message_id)
}
