//! Outreach: start a conversation by messaging a phone number first.

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::identity::ContactId;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl Bridge {
    /// Resolve `phone`, send `first_message`, and start a conversation governed by `instruction`.
    ///
    /// The first message is recorded as an assistant message. Resolution and send errors
    /// propagate unchanged; a contact imported before a failed send is left in place.
    pub async fn initiate(
        &self,
        phone: &str,
        first_message: &str,
        instruction: &str,
    ) -> Result<ContactId> {
        if is_blank(phone) || is_blank(first_message) || is_blank(instruction) {
            return Err(Error::Validation(
                "phone, firstMessage and prompt are required".to_string(),
            ));
        }
        log::info!("outreach: sending first message to {}", phone);
        log::debug!("outreach: text: {}", first_message);

        let id = self.resolver.resolve(phone).await?;
        self.transport.send_direct_message(&id, first_message).await?;
        self.store.create(id.clone(), instruction, first_message).await;

        log::info!("outreach: conversation created for user {}", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::bridge::Bridge;
    use crate::conversation::Message;
    use crate::error::Error;
    use crate::identity::ContactId;
    use crate::testing::{FakeCompletion, FakeTransport};
    use std::sync::Arc;

    async fn bridge() -> (Bridge, Arc<FakeTransport>, Arc<FakeCompletion>) {
        let transport = Arc::new(FakeTransport::new());
        transport.register("+123", &["U1"]).await;
        let completion = Arc::new(FakeCompletion::new());
        (
            Bridge::new(transport.clone(), completion.clone()),
            transport,
            completion,
        )
    }

    #[tokio::test]
    async fn initiate_sends_and_seeds_conversation() {
        let (bridge, transport, completion) = bridge().await;

        let id = bridge.initiate("+123", "Hi there", "Be friendly").await.unwrap();
        assert_eq!(id, ContactId::new("U1"));

        let conv = bridge.store().get(&id).await.unwrap();
        assert_eq!(
            conv.messages,
            vec![Message::system("Be friendly"), Message::assistant("Hi there")]
        );
        assert_eq!(
            transport.sent().await,
            vec![(ContactId::new("U1"), "Hi there".to_string())]
        );
        assert!(completion.calls().await.is_empty());
    }

    #[tokio::test]
    async fn initiate_unknown_phone_is_not_found() {
        let (bridge, transport, _) = bridge().await;
        let err = bridge.initiate("+999", "Hi", "p").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(transport.sent().await.is_empty());
        assert!(bridge.store().is_empty().await);
    }

    #[tokio::test]
    async fn failed_send_creates_no_conversation() {
        let (bridge, transport, _) = bridge().await;
        transport.fail_sends(true);
        let err = bridge.initiate("+123", "Hi", "p").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(bridge.store().is_empty().await);
        assert_eq!(transport.imports().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_any_io() {
        let (bridge, transport, _) = bridge().await;
        for (phone, first, prompt) in [("", "Hi", "p"), ("+123", " ", "p"), ("+123", "Hi", "")] {
            let err = bridge.initiate(phone, first, prompt).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(transport.imports().await.is_empty());
    }

    #[tokio::test]
    async fn second_outreach_resets_history() {
        let (bridge, _, _) = bridge().await;
        let id = bridge.initiate("+123", "Hi", "first").await.unwrap();
        bridge.store().append_user(&id, "hello").await.unwrap();
        bridge.initiate("+123", "Hi again", "second").await.unwrap();
        let conv = bridge.store().get(&id).await.unwrap();
        assert_eq!(
            conv.messages,
            vec![Message::system("second"), Message::assistant("Hi again")]
        );
    }
}
