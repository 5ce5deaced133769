//! Inbound routing: append the contact's message, ask the model, relay its reply.
//!
//! `run` consumes the transport's inbound channel and hands each event to a
//! per-contact lane. A lane is one task with its own queue, so one contact's
//! events are handled strictly in arrival order while different contacts
//! proceed concurrently. Lanes with no pending events are dropped.

use crate::bridge::Bridge;
use crate::channels::InboundMessage;
use crate::error::{Error, Result};
use crate::identity::ContactId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Why an inbound event was dropped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoText,
    NoSender,
    NoConversation,
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Ignored(IgnoreReason),
    Replied { contact: ContactId, reply: String },
}

impl Bridge {
    /// Handle one inbound event end to end. Ignored events never touch the store or the backend.
    ///
    /// A failure after the user message is appended leaves it recorded.
    pub async fn handle_inbound(&self, msg: InboundMessage) -> Result<InboundOutcome> {
        let Some(text) = msg.body() else {
            return Ok(InboundOutcome::Ignored(IgnoreReason::NoText));
        };
        let Some(sender) = msg.sender.as_ref() else {
            return Ok(InboundOutcome::Ignored(IgnoreReason::NoSender));
        };
        if !self.store.contains(sender).await {
            return Ok(InboundOutcome::Ignored(IgnoreReason::NoConversation));
        }
        log::debug!("inbound: user {}: {}", sender, text);

        let turn = self.store.begin_turn(sender, text).await?;
        let reply = tokio::time::timeout(self.completion_timeout, self.completion.complete(&turn.history))
            .await
            .map_err(|_| {
                Error::Completion(format!(
                    "timed out after {}s",
                    self.completion_timeout.as_secs_f32()
                ))
            })??;
        log::debug!("inbound: reply for user {}: {}", sender, reply.content);

        turn.record_reply(reply.content.as_str()).await;
        self.transport
            .send_direct_message(sender, &reply.content)
            .await?;
        Ok(InboundOutcome::Replied {
            contact: sender.clone(),
            reply: reply.content,
        })
    }
}

/// Handle one event and log the outcome; errors stop here.
async fn process_inbound(bridge: &Bridge, msg: InboundMessage) {
    match bridge.handle_inbound(msg).await {
        Ok(InboundOutcome::Replied { contact, .. }) => {
            log::info!("inbound: reply sent to user {}", contact);
        }
        Ok(InboundOutcome::Ignored(reason)) => {
            log::debug!("inbound: ignored ({:?})", reason);
        }
        Err(e) => {
            log::warn!("inbound: dropping message: {}", e);
        }
    }
}

struct Lane {
    tx: mpsc::UnboundedSender<InboundMessage>,
    /// Events queued or in flight on this lane.
    pending: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl Lane {
    fn push(&self, msg: InboundMessage) -> std::result::Result<(), InboundMessage> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(msg).map_err(|mpsc::error::SendError(msg)| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            msg
        })
    }

    fn is_idle(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

fn spawn_lane(bridge: Bridge, contact: ContactId) -> Lane {
    let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
    let pending = Arc::new(AtomicUsize::new(0));
    let counter = pending.clone();
    let task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            process_inbound(&bridge, msg).await;
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        log::debug!("inbound: lane for user {} closed", contact);
    });
    Lane { tx, pending, task }
}

/// Drop lanes with nothing queued or in flight. Their tasks exit once the sender is gone.
fn prune_idle(lanes: &mut HashMap<ContactId, Lane>) {
    lanes.retain(|_, lane| !lane.is_idle());
}

/// Route inbound events until the channel closes, then drain every lane.
pub async fn run(bridge: Bridge, mut inbound_rx: mpsc::Receiver<InboundMessage>) {
    let mut lanes: HashMap<ContactId, Lane> = HashMap::new();
    while let Some(msg) = inbound_rx.recv().await {
        prune_idle(&mut lanes);
        if msg.body().is_none() {
            log::debug!("inbound: no text, ignoring");
            continue;
        }
        let Some(sender) = msg.sender.clone() else {
            log::debug!("inbound: no resolvable sender, ignoring");
            continue;
        };
        if !bridge.store.contains(&sender).await {
            log::debug!("inbound: no conversation for user {}, ignoring", sender);
            continue;
        }

        let msg = match lanes.get(&sender) {
            Some(lane) => match lane.push(msg) {
                Ok(()) => continue,
                Err(msg) => msg,
            },
            None => msg,
        };
        let lane = spawn_lane(bridge.clone(), sender.clone());
        if lane.push(msg).is_err() {
            log::warn!("inbound: lane for user {} closed before first message", sender);
        }
        lanes.insert(sender, lane);
    }

    log::info!("inbound: channel closed, draining {} lane(s)", lanes.len());
    for (_, lane) in lanes.drain() {
        drop(lane.tx);
        let _ = lane.task.await;
    }
}
