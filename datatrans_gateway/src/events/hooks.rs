use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::task::JoinHandle;

use crate::{
    events::{EventHandler, EventProducer, Handler, TransactionEvent},
    records::EventChannel,
};

/// The notifier handed to the gateway. Each event goes to the producers subscribed to its channel.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub alias_registration_done_producer: Vec<EventProducer<TransactionEvent>>,
    pub payment_done_producer: Vec<EventProducer<TransactionEvent>>,
    pub alias_payment_done_producer: Vec<EventProducer<TransactionEvent>>,
    pub refund_done_producer: Vec<EventProducer<TransactionEvent>>,
}

impl EventProducers {
    pub fn for_channel(&self, channel: EventChannel) -> &[EventProducer<TransactionEvent>] {
        match channel {
            EventChannel::AliasRegistrationDone => &self.alias_registration_done_producer,
            EventChannel::PaymentDone => &self.payment_done_producer,
            EventChannel::AliasPaymentDone => &self.alias_payment_done_producer,
            EventChannel::RefundDone => &self.refund_done_producer,
        }
    }

    pub async fn notify(&self, event: TransactionEvent) {
        let producers = self.for_channel(event.channel);
        if producers.is_empty() {
            trace!("📬️ Nobody is subscribed to {:?}", event.channel);
            return;
        }
        debug!("📬️ Notifying {:?} subscribers of {}", event.channel, event.record);
        for producer in producers {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_alias_registration_done: Option<EventHandler<TransactionEvent>>,
    pub on_payment_done: Option<EventHandler<TransactionEvent>>,
    pub on_alias_payment_done: Option<EventHandler<TransactionEvent>>,
    pub on_refund_done: Option<EventHandler<TransactionEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let handler = |name: &'static str, hook: Option<Handler<TransactionEvent>>| {
            hook.map(|f| EventHandler::new(name, buffer_size, f))
        };
        Self {
            on_alias_registration_done: handler("alias_registration_done", hooks.on_alias_registration_done),
            on_payment_done: handler("payment_done", hooks.on_payment_done),
            on_alias_payment_done: handler("alias_payment_done", hooks.on_alias_payment_done),
            on_refund_done: handler("refund_done", hooks.on_refund_done),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let subscribe = |h: &Option<EventHandler<TransactionEvent>>| -> Vec<EventProducer<TransactionEvent>> {
            h.iter().map(|h| h.subscribe()).collect()
        };
        EventProducers {
            alias_registration_done_producer: subscribe(&self.on_alias_registration_done),
            payment_done_producer: subscribe(&self.on_payment_done),
            alias_payment_done_producer: subscribe(&self.on_alias_payment_done),
            refund_done_producer: subscribe(&self.on_refund_done),
        }
    }

    /// Spawns every configured handler. The handles complete once all producers are dropped and pending hooks are done.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        [self.on_alias_registration_done, self.on_payment_done, self.on_alias_payment_done, self.on_refund_done]
            .into_iter()
            .flatten()
            .map(|handler| tokio::spawn(handler.start_handler()))
            .collect()
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_alias_registration_done: Option<Handler<TransactionEvent>>,
    pub on_payment_done: Option<Handler<TransactionEvent>>,
    pub on_alias_payment_done: Option<Handler<TransactionEvent>>,
    pub on_refund_done: Option<Handler<TransactionEvent>>,
}

impl EventHooks {
    pub fn on_alias_registration_done<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_alias_registration_done = Some(Arc::new(f));
        self
    }

    /// Payments the user made through the payment form
    pub fn on_payment_done<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_done = Some(Arc::new(f));
        self
    }

    /// Payments charged against a registered alias
    pub fn on_alias_payment_done<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_alias_payment_done = Some(Arc::new(f));
        self
    }

    pub fn on_refund_done<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_refund_done = Some(Arc::new(f));
        self
    }
}
