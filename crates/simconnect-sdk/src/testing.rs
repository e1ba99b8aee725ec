//! In-crate transport for unit tests: records every verb, replays queued
//! messages, and can be told to fail chosen calls.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use simconnect_models::{RawMessage, SendId, WireMessage};

use crate::error::{HostResult, SdkError};
use crate::transport::{NotifyMode, OpenParams, Transport, Verb};

type Responder = Box<dyn Fn(&Verb) -> Vec<RawMessage> + Send + Sync>;

#[derive(Default)]
pub struct ScriptedTransport {
    sent: Mutex<Vec<Verb>>,
    inbox: Mutex<VecDeque<Vec<u8>>>,
    failing: Mutex<HashSet<&'static str>>,
    responder: Mutex<Option<Responder>>,
    notify: Mutex<NotifyMode>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    next_send_id: AtomicU32,
    fail_open: Mutex<bool>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push<M: WireMessage>(&self, message: &M) {
        self.push_raw(RawMessage::from_message(message).as_bytes().to_vec());
    }

    pub fn push_raw(&self, bytes: Vec<u8>) {
        self.inbox.lock().unwrap().push_back(bytes);
        if let NotifyMode::Event(notification) = &*self.notify.lock().unwrap() {
            notification.signal();
        }
    }

    pub fn respond_with(&self, responder: impl Fn(&Verb) -> Vec<RawMessage> + Send + Sync + 'static) {
        *self.responder.lock().unwrap() = Some(Box::new(responder));
    }

    pub fn fail(&self, verb_name: &'static str) {
        self.failing.lock().unwrap().insert(verb_name);
    }

    pub fn fail_open(&self) {
        *self.fail_open.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<Verb> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_named(&self, name: &str) -> Vec<Verb> {
        self.sent()
            .into_iter()
            .filter(|verb| verb.name() == name)
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, params: &OpenParams) -> HostResult<()> {
        if *self.fail_open.lock().unwrap() {
            return Err(SdkError::transport("Open"));
        }
        *self.notify.lock().unwrap() = params.notify.clone();
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn next_message(&self) -> HostResult<Option<Vec<u8>>> {
        Ok(self.inbox.lock().unwrap().pop_front())
    }

    fn send(&self, verb: &Verb) -> HostResult<SendId> {
        if self.failing.lock().unwrap().contains(verb.name()) {
            return Err(SdkError::transport(verb.name()));
        }
        self.sent.lock().unwrap().push(verb.clone());
        let replies = match &*self.responder.lock().unwrap() {
            Some(responder) => responder(verb),
            None => Vec::new(),
        };
        for reply in replies {
            self.push_raw(reply.as_bytes().to_vec());
        }
        Ok(self.next_send_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// A dispatcher over an open connection to a fresh scripted transport.
pub fn connected() -> (Arc<ScriptedTransport>, crate::dispatch::Dispatcher) {
    let transport = ScriptedTransport::new();
    let connection = crate::connection::Connection::new("test", transport.clone());
    connection.open(0).unwrap();
    (transport, crate::dispatch::Dispatcher::new(connection))
}
