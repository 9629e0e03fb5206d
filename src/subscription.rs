//! Topic subscriptions on a bridge connection
//!
//! A [`Subscription`] binds a callback to one named stream. It only exists
//! while its connection is connected: subscribing on a missing or
//! disconnected connection yields an inert subscription, and a connection
//! that closes takes all of its subscriptions down with it. Callers re-derive
//! subscriptions when the connection changes instead of retrying.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::connection::BridgeConnection;
use crate::driver::{Command, Route, Sink};
use crate::BridgeError;
use crate::protocol::BridgeOp;
use crate::types::UpdateRate;

/// A named stream with a declared message type
pub struct Topic<T> {
    name: String,
    message_type: String,
    queue_length: usize,
    throttle: UpdateRate,
    _message: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    pub fn new(name: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_type: message_type.into(),
            queue_length: 1,
            throttle: UpdateRate::Native,
            _message: PhantomData,
        }
    }

    /// Unread messages kept before dropping; at least 1
    pub fn with_queue_length(mut self, queue_length: usize) -> Self {
        self.queue_length = queue_length.max(1);
        self
    }

    pub fn with_throttle(mut self, throttle: UpdateRate) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn queue_length(&self) -> usize {
        self.queue_length
    }

    /// Bridge-side throttle in milliseconds
    pub fn throttle_rate(&self) -> u64 {
        self.throttle.throttle_millis()
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            message_type: self.message_type.clone(),
            queue_length: self.queue_length,
            throttle: self.throttle,
            _message: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("message_type", &self.message_type)
            .field("queue_length", &self.queue_length)
            .field("throttle", &self.throttle)
            .finish()
    }
}

/// Interest in one stream; released on [`Subscription::unsubscribe`] or drop
pub struct Subscription {
    topic: String,
    active: Option<ActiveSubscription>,
}

struct ActiveSubscription {
    id: String,
    connection: BridgeConnection,
    cancel: CancellationToken,
}

/// Subscribe `callback` to `topic`
///
/// Returns an inert subscription when `connection` is `None` or not
/// connected. Otherwise every message on the topic is decoded as `T` and
/// handed to `callback` once, in arrival order, from a task on the current
/// Tokio runtime. Messages that do not decode as `T` are logged and skipped.
pub fn subscribe<T, F>(
    connection: Option<&BridgeConnection>,
    topic: Topic<T>,
    callback: F,
) -> Subscription
where
    T: DeserializeOwned + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let Some(connection) = connection.filter(|c| c.is_connected()) else {
        debug!(topic = %topic.name, "Bridge not connected; subscription is inert");
        return Subscription::inert(topic.name);
    };

    let id = connection.next_subscription_id(&topic.name);
    let (sink, source) = if topic.queue_length <= 1 {
        let (tx, rx) = watch::channel(None);
        (Sink::Latest(tx), Source::Latest(rx))
    } else {
        let (tx, rx) = mpsc::channel(topic.queue_length);
        (Sink::Queued(tx), Source::Queued(rx))
    };

    let op = BridgeOp::Subscribe {
        id: id.clone(),
        topic: topic.name.clone(),
        message_type: topic.message_type.clone(),
        queue_length: topic.queue_length,
        throttle_rate: topic.throttle_rate(),
    };
    let route = Route { id: id.clone(), topic: topic.name.clone(), sink };
    if !connection.send_command(Command::Subscribe { route, op }) {
        debug!(topic = %topic.name, "Connection driver already gone; subscription is inert");
        return Subscription::inert(topic.name);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(dispatch(source, cancel.clone(), topic.name.clone(), callback));

    debug!(
        id = %id,
        topic = %topic.name,
        message_type = %topic.message_type,
        connection_id = connection.id(),
        "Subscribed"
    );

    Subscription {
        topic: topic.name,
        active: Some(ActiveSubscription { id, connection: connection.clone(), cancel }),
    }
}

impl Subscription {
    /// A subscription that never delivers anything
    pub fn inert(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), active: None }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Bridge-side subscription id; `None` for inert subscriptions
    pub fn id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    /// Whether this subscription can still deliver messages
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.cancel.is_cancelled() && a.connection.is_connected())
    }

    /// Stop delivery and release the bridge-side subscription
    ///
    /// Safe to call any number of times, and on a connection that is already
    /// gone. No callback runs after this returns.
    pub fn unsubscribe(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();

        let command = Command::Unsubscribe { id: active.id.clone(), topic: self.topic.clone() };
        if active.connection.send_command(command) {
            debug!(id = %active.id, topic = %self.topic, "Unsubscribed");
        } else {
            debug!(id = %active.id, topic = %self.topic, "Connection already closed; nothing to release");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Subscriber end of a [`Sink`]
enum Source {
    Latest(watch::Receiver<Option<Arc<Value>>>),
    Queued(mpsc::Receiver<Arc<Value>>),
}

impl Source {
    /// `None` once the driver dropped the sink
    async fn recv(&mut self) -> Option<Arc<Value>> {
        match self {
            Source::Latest(rx) => loop {
                rx.changed().await.ok()?;
                let latest = rx.borrow_and_update().clone();
                if latest.is_some() {
                    return latest;
                }
            },
            Source::Queued(rx) => rx.recv().await,
        }
    }
}

async fn dispatch<T, F>(mut source: Source, cancel: CancellationToken, topic: String, mut callback: F)
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = source.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        // Cancellation may have landed while this message was queued
        if cancel.is_cancelled() {
            break;
        }

        match T::deserialize(&*msg) {
            Ok(decoded) => callback(decoded),
            Err(e) => {
                let err = BridgeError::decode_error(&topic, e.to_string());
                warn!(topic = %topic, "Skipping message: {}", err);
            }
        }
    }
    trace!(topic = %topic, "Dispatcher ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ODOMETRY_TYPE, OdometryMessage};

    #[test]
    fn topic_defaults_to_latest_sample_only() {
        let topic: Topic<OdometryMessage> = Topic::new("mavros/local_position/odom", ODOMETRY_TYPE);
        assert_eq!(topic.queue_length(), 1);
        assert_eq!(topic.throttle_rate(), 0);
        assert_eq!(topic.with_queue_length(0).queue_length(), 1);
    }

    #[test]
    fn topic_throttle_maps_to_millis() {
        let topic: Topic<OdometryMessage> =
            Topic::new("odom", ODOMETRY_TYPE).with_throttle(UpdateRate::Max(10));
        assert_eq!(topic.throttle_rate(), 100);
    }

    #[test]
    fn subscribing_without_connection_is_inert() {
        let topic: Topic<OdometryMessage> = Topic::new("odom", ODOMETRY_TYPE);
        let mut sub = subscribe(None, topic, |_msg: OdometryMessage| {
            panic!("inert subscription must never deliver");
        });
        assert!(!sub.is_active());
        assert_eq!(sub.id(), None);
        assert_eq!(sub.topic(), "odom");
        sub.unsubscribe();
        sub.unsubscribe();
    }
}
