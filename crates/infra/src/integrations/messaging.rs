//! Patient messaging (SMS / e-mail) through the messaging provider

use std::sync::Arc;

use async_trait::async_trait;
use clinix_common::{Clock, SystemClock};
use clinix_core::{MessageReceipt, MessagingPort, OutboundMessage};
use clinix_domain::{ClinixError, Result};
use tracing::{error, info};

use super::tenant_headers;
use crate::http::ResilientHttpClient;

/// [`MessagingPort`] backed by the messaging provider's REST API
///
/// Unlike calendar sync, send failures are returned to the caller.
pub struct MessagingAdapter<C: Clock = SystemClock> {
    client: Arc<ResilientHttpClient<C>>,
}

impl<C: Clock> MessagingAdapter<C> {
    pub fn new(client: Arc<ResilientHttpClient<C>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: Clock> MessagingPort for MessagingAdapter<C> {
    async fn send_message(&self, message: &OutboundMessage) -> Result<MessageReceipt> {
        let headers = tenant_headers(&message.tenant_id).map_err(ClinixError::from)?;

        match self.client.post::<_, MessageReceipt>("/messages", message, Some(headers)).await {
            Ok(response) => {
                info!(
                    tenant_id = %message.tenant_id,
                    channel = ?message.channel,
                    message_id = %response.data.message_id,
                    "Message accepted by provider"
                );
                Ok(response.data)
            }
            Err(err) => {
                error!(
                    tenant_id = %message.tenant_id,
                    channel = ?message.channel,
                    error = %err,
                    "Message delivery failed"
                );
                Err(err.into())
            }
        }
    }
}
