//! One-shot effects sent from the orchestrator to the view.
//!
//! UI events and navigation requests travel through an [`EffectChannel`]: a
//! bounded queue with at most one subscriber. Values emitted before the view
//! subscribes are kept until it does. Each delivery carries a
//! [`DeliveryPolicy`]; `Retry` deliveries stay in flight until acknowledged and
//! are redelivered if the subscriber goes away first.

use super::args::EditResult;
use super::message::EditMessage;
use chrono::NaiveDate;
use diary_core::diary::ItemNumber;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;

/// How hard the channel tries to get a value to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Redeliver until the view acknowledges.
    Retry,
    /// Deliver once; drop if the view does not handle it.
    Single,
}

/// A value handed to the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub id: u64,
    pub policy: DeliveryPolicy,
    pub payload: T,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel already has an active subscriber")]
    AlreadySubscribed,
}

/// Events the view reacts to without navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    OpenImagePicker,
    /// Start the removal animation of an item; report completion back.
    BeginItemRemoval(ItemNumber),
}

/// Screens and dialogs the view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    DatePicker { date: NaiveDate },
    LoadConflictDialog { date: NaiveDate },
    UpdateConflictDialog { date: NaiveDate },
    DeleteConfirmDialog { date: NaiveDate },
    ItemDeleteDialog { item_number: ItemNumber },
    WeatherFetchDialog { date: NaiveDate },
    ExitWithoutSaveDialog,
    MessageDialog(EditMessage),
    /// Leave the edit screen, handing `result` to the caller under `result_key`.
    Back { result_key: String, result: EditResult },
}

struct ChannelState<T> {
    queue: VecDeque<Delivery<T>>,
    /// Retry deliveries handed out but not yet acknowledged
    in_flight: Vec<Delivery<T>>,
    /// Retry deliveries waiting to be handed out again
    redeliver: VecDeque<Delivery<T>>,
    capacity: usize,
    next_id: u64,
    subscribed: bool,
}

/// Bounded single-subscriber queue of one-shot effects.
pub struct EffectChannel<T> {
    state: Arc<Mutex<ChannelState<T>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for EffectChannel<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T: Clone + std::fmt::Debug> EffectChannel<T> {
    /// Creates a channel holding at most `capacity` undelivered values.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                queue: VecDeque::new(),
                in_flight: Vec::new(),
                redeliver: VecDeque::new(),
                capacity: capacity.max(1),
                next_id: 0,
                subscribed: false,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Queues `payload` and returns its delivery id.
    ///
    /// When the queue is full the oldest undelivered value is dropped.
    pub fn emit(&self, payload: T, policy: DeliveryPolicy) -> u64 {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            if state.queue.len() >= state.capacity {
                if let Some(dropped) = state.queue.pop_front() {
                    tracing::warn!(
                        "[EffectChannel] Dropping undelivered effect {}: {:?}",
                        dropped.id,
                        dropped.payload
                    );
                }
            }
            state.queue.push_back(Delivery {
                id,
                policy,
                payload,
            });
            id
        };
        self.notify.notify_one();
        id
    }

    /// Attaches the single subscriber.
    pub fn subscribe(&self) -> Result<EffectSubscription<T>, ChannelError> {
        let mut state = self.lock();
        if state.subscribed {
            return Err(ChannelError::AlreadySubscribed);
        }
        state.subscribed = true;
        Ok(EffectSubscription {
            channel: self.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The active subscriber of an [`EffectChannel`].
///
/// Dropping the subscription detaches it; unacknowledged `Retry` deliveries are
/// queued for the next subscriber.
pub struct EffectSubscription<T: Clone + std::fmt::Debug> {
    channel: EffectChannel<T>,
}

impl<T: Clone + std::fmt::Debug> EffectSubscription<T> {
    /// Takes the next value without waiting.
    pub fn try_recv(&mut self) -> Option<Delivery<T>> {
        let mut state = self.channel.lock();
        let delivery = state
            .redeliver
            .pop_front()
            .or_else(|| state.queue.pop_front())?;
        if delivery.policy == DeliveryPolicy::Retry {
            state.in_flight.push(delivery.clone());
        }
        Some(delivery)
    }

    /// Waits for the next value.
    pub async fn recv(&mut self) -> Delivery<T> {
        let notify = Arc::clone(&self.channel.notify);
        loop {
            let notified = notify.notified();
            if let Some(delivery) = self.try_recv() {
                return delivery;
            }
            notified.await;
        }
    }

    /// Confirms that the view handled delivery `id`.
    pub fn ack(&self, id: u64) {
        let mut state = self.channel.lock();
        state.in_flight.retain(|delivery| delivery.id != id);
    }

    /// Reports that the view could not handle delivery `id`; it is delivered again.
    pub fn nack(&self, id: u64) {
        let requeued = {
            let mut state = self.channel.lock();
            match state.in_flight.iter().position(|delivery| delivery.id == id) {
                Some(index) => {
                    let delivery = state.in_flight.remove(index);
                    state.redeliver.push_back(delivery);
                    true
                }
                None => false,
            }
        };
        if requeued {
            self.channel.notify.notify_one();
        }
    }
}

impl<T: Clone + std::fmt::Debug> Drop for EffectSubscription<T> {
    fn drop(&mut self) {
        let mut state = self.channel.lock();
        let in_flight = std::mem::take(&mut state.in_flight);
        if !in_flight.is_empty() {
            tracing::debug!(
                "[EffectChannel] Subscriber detached with {} unacknowledged deliveries",
                in_flight.len()
            );
        }
        for delivery in in_flight.into_iter().rev() {
            state.redeliver.push_front(delivery);
        }
        state.subscribed = false;
    }
}
