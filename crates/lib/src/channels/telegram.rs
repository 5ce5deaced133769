//! Telegram transport: MTProto user client (contact import, direct messages, update stream).

use crate::channels::inbound::InboundMessage;
use crate::channels::transport::{ContactImport, Transport};
use crate::config::TelegramCredentials;
use crate::error::{Error, Result};
use crate::identity::ContactId;
use async_trait::async_trait;
use base64::Engine;
use grammers_client::types::{Chat, Message};
use grammers_client::{Client, Config, InitParams, SignInError, Update};
use grammers_session::{PackedChat, PackedType, Session};
use grammers_tl_types as tl;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;

const UPDATE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Telegram connector: imports contacts, sends messages and streams incoming private messages.
pub struct TelegramTransport {
    client: Client,
    peers: PeerCache,
    stop: Notify,
}

/// user id -> packed peer (id + access hash), needed to address a user.
///
/// Filled by contact import only; inbound traffic refreshes known entries but never adds one.
#[derive(Default)]
struct PeerCache {
    peers: RwLock<HashMap<i64, PackedChat>>,
}

impl PeerCache {
    async fn remember(&self, peer: PackedChat) {
        self.peers.write().await.insert(peer.id, peer);
    }

    /// Replace the entry for an already known user. Returns false for unknown users.
    async fn refresh(&self, peer: PackedChat) -> bool {
        match self.peers.write().await.get_mut(&peer.id) {
            Some(entry) => {
                *entry = peer;
                true
            }
            None => false,
        }
    }

    async fn get(&self, user_id: i64) -> Option<PackedChat> {
        self.peers.read().await.get(&user_id).cloned()
    }

    async fn len(&self) -> usize {
        self.peers.read().await.len()
    }
}

/// Decode a base64 session string; empty or missing yields a fresh session.
fn load_session(encoded: Option<&str>) -> Result<Session> {
    match encoded.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Session::new()),
        Some(s) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| Error::Transport(format!("invalid session string: {}", e)))?;
            Session::load(&bytes)
                .map_err(|e| Error::Transport(format!("invalid session data: {}", e)))
        }
    }
}

fn encode_session(client: &Client) -> String {
    base64::engine::general_purpose::STANDARD.encode(client.session().save())
}

async fn connect_client(creds: &TelegramCredentials) -> Result<Client> {
    let session = load_session(creds.session.as_deref())?;
    Client::connect(Config {
        session,
        api_id: creds.api_id,
        api_hash: creds.api_hash.clone(),
        params: InitParams::default(),
    })
    .await
    .map_err(Error::transport)
}

fn packed_user(user: &tl::types::User) -> PackedChat {
    PackedChat {
        ty: if user.bot {
            PackedType::Bot
        } else {
            PackedType::User
        },
        id: user.id,
        access_hash: user.access_hash,
    }
}

impl TelegramTransport {
    /// Connect with a saved session. Fails when the session is missing or not authorized.
    pub async fn connect(creds: &TelegramCredentials) -> Result<Self> {
        log::info!("telegram: connecting");
        let client = connect_client(creds).await?;
        let authorized = client.is_authorized().await.map_err(Error::transport)?;
        if !authorized {
            return Err(Error::Transport(
                "telegram session is not authorized; run `courier login` and set TELEGRAM_SESSION"
                    .to_string(),
            ));
        }
        log::info!("telegram: connected");
        Ok(Self {
            client,
            peers: PeerCache::default(),
            stop: Notify::new(),
        })
    }

    /// Start the update loop and forward incoming messages to the router. Returns a handle to await on shutdown.
    pub fn start_inbound(self: Arc<Self>, inbound_tx: mpsc::Sender<InboundMessage>) -> JoinHandle<()> {
        log::info!("telegram: listening for incoming messages");
        tokio::spawn(async move {
            run_update_loop(self, inbound_tx).await;
        })
    }

    /// Stop the update loop.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Convert an incoming message; only private chats with a user count as a resolvable sender.
    async fn inbound_from(&self, message: &Message) -> InboundMessage {
        let sender = match (message.chat(), message.sender()) {
            (Chat::User(_), Some(Chat::User(user))) => {
                let peer = user.pack();
                if peer.access_hash.is_some() {
                    self.peers.refresh(peer).await;
                }
                Some(ContactId::from(user.id()))
            }
            _ => None,
        };
        let text = message.text();
        InboundMessage {
            sender,
            text: if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
        }
    }
}

async fn run_update_loop(transport: Arc<TelegramTransport>, inbound_tx: mpsc::Sender<InboundMessage>) {
    loop {
        let update = tokio::select! {
            _ = transport.stop.notified() => break,
            update = transport.client.next_update() => update,
        };
        match update {
            Ok(Update::NewMessage(message)) if !message.outgoing() => {
                let inbound = transport.inbound_from(&message).await;
                if inbound_tx.send(inbound).await.is_err() {
                    log::debug!("telegram: inbound channel closed, stopping loop");
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("telegram: update stream error: {}", e);
                tokio::time::sleep(UPDATE_RETRY_DELAY).await;
            }
        }
    }
    log::info!("telegram: update loop stopped");
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn import_contact(&self, contact: &ContactImport) -> Result<Vec<ContactId>> {
        let request = tl::functions::contacts::ImportContacts {
            contacts: vec![tl::types::InputPhoneContact {
                client_id: contact.client_id,
                phone: contact.phone.clone(),
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
            }
            .into()],
        };
        let tl::enums::contacts::ImportedContacts::Contacts(imported) = self
            .client
            .invoke(&request)
            .await
            .map_err(Error::transport)?;

        let mut matched = Vec::with_capacity(imported.users.len());
        for user in imported.users {
            if let tl::enums::User::User(user) = user {
                self.peers.remember(packed_user(&user)).await;
                matched.push(ContactId::from(user.id));
            }
        }
        log::info!(
            "telegram: import matched {} user(s), {} known peer(s)",
            matched.len(),
            self.peers.len().await
        );
        Ok(matched)
    }

    async fn send_direct_message(&self, to: &ContactId, text: &str) -> Result<()> {
        let user_id: i64 = to
            .as_str()
            .parse()
            .map_err(|_| Error::Transport(format!("not a telegram user id: {}", to)))?;
        let peer = self
            .peers
            .get(user_id)
            .await
            .ok_or_else(|| Error::Transport(format!("no known peer for user {}", to)))?;
        self.client
            .send_message(peer, text)
            .await
            .map_err(Error::transport)?;
        Ok(())
    }
}

/// Interactive user login. `prompt` is asked for missing values (phone, code, 2FA password).
/// Returns the session string to store in `TELEGRAM_SESSION`.
pub async fn login_interactive<F>(
    creds: &TelegramCredentials,
    phone: Option<String>,
    mut prompt: F,
) -> anyhow::Result<String>
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    let client = connect_client(creds).await?;
    if client.is_authorized().await.map_err(Error::transport)? {
        log::info!("telegram: session already authorized");
        return Ok(encode_session(&client));
    }

    let phone = match phone {
        Some(p) => p,
        None => prompt("Telegram phone number (+380...): ")?,
    };
    let token = client
        .request_login_code(phone.trim())
        .await
        .map_err(|e| anyhow::anyhow!("requesting login code: {}", e))?;
    let code = prompt("Login code from Telegram: ")?;
    match client.sign_in(&token, code.trim()).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&format!("2FA password (hint: {}): ", hint))?;
            client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| anyhow::anyhow!("checking 2FA password: {}", e))?;
        }
        Err(e) => anyhow::bail!("sign in failed: {}", e),
    }
    log::info!("telegram: login successful");
    Ok(encode_session(&client))
}
