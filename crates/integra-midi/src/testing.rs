//! In-memory ports for tests
//!
//! `MockPort` records what is sent to it and lets tests inject received
//! messages. A responder hook on a writable port can answer requests on a
//! readable one, optionally from another thread after a delay.

use crate::endpoint::Endpoint;
use crate::transport::{
    Callback, Capability, Delivery, Port, SubscriberList, Subscription, Transport, TransportError,
};
use integra_core::protocol::{DataSet, Frame};
use integra_core::Int7;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub type Responder = Box<dyn FnMut(&[u8]) + Send>;

/// Identity Reply of an INTEGRA-7 at device ID 17
pub const INTEGRA_IDENTITY: [u8; 15] = [
    0xF0, 0x7E, 0x10, 0x06, 0x02, 0x41, 0x64, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF7,
];

pub struct MockPort {
    name: String,
    capability: Capability,
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: AtomicBool,
    subscribers: Arc<SubscriberList>,
    sent: Mutex<Vec<Vec<u8>>>,
    responder: Mutex<Option<Responder>>,
}

impl MockPort {
    pub fn new(name: &str, capability: Capability) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            capability,
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            subscribers: SubscriberList::new(),
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
        })
    }

    pub fn readable(name: &str) -> Arc<Self> {
        Self::new(name, Capability::Read)
    }

    pub fn writable(name: &str) -> Arc<Self> {
        Self::new(name, Capability::Write)
    }

    pub fn endpoint(self: &Arc<Self>) -> Endpoint {
        Endpoint::new(self.clone())
    }

    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver a message as if the device had sent it (dropped while closed)
    pub fn inject(&self, bytes: &[u8]) {
        if self.is_connected() {
            self.subscribers.deliver(Delivery::Data(bytes));
        }
    }

    pub fn respond_with(&self, responder: impl FnMut(&[u8]) + Send + 'static) {
        *self.responder.lock().unwrap() = Some(Box::new(responder));
    }
}

impl Port for MockPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connect(&self) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::EndpointUnavailable {
                name: self.name.clone(),
                reason: "mock refused".to_string(),
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.subscribers.deliver(Delivery::Closed);
        }
    }

    fn send(&self, bytes: &[u8], _at: Option<Instant>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed(self.name.clone()));
        }
        self.sent.lock().unwrap().push(bytes.to_vec());
        if let Some(responder) = self.responder.lock().unwrap().as_mut() {
            responder(bytes);
        }
        Ok(())
    }

    fn subscribe(&self, callback: Callback) -> Result<Subscription, TransportError> {
        Ok(self.subscribers.subscribe(callback))
    }
}

pub struct MockTransport {
    pub endpoints: Vec<Endpoint>,
}

impl Transport for MockTransport {
    fn endpoints(&self) -> Result<Vec<Endpoint>, TransportError> {
        Ok(self.endpoints.clone())
    }
}

/// Answer identity requests sent to `output` by injecting `reply` into
/// `input` `times` times, after `delay`, from a separate thread
pub fn answer_identity(
    output: &Arc<MockPort>,
    input: &Arc<MockPort>,
    reply: Vec<u8>,
    delay: Duration,
    times: usize,
) {
    let input = input.clone();
    output.respond_with(move |bytes| {
        if Frame::parse(bytes) == Some(Frame::IdentityRequest) {
            let input = input.clone();
            let reply = reply.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                for _ in 0..times {
                    input.inject(&reply);
                }
            });
        }
    });
}

/// Content of the emulated device memory at linear address `addr`
pub fn memory_byte(addr: u32) -> u8 {
    (addr % 0x80) as u8
}

/// Emulate a device behind `output`/`input`
///
/// Answers identity requests and RQ1 reads synchronously, splitting read
/// replies into DT1 frames of at most `chunk` bytes. DT1 writes are recorded
/// by `output` only.
pub fn emulate_integra(output: &Arc<MockPort>, input: &Arc<MockPort>, chunk: usize) {
    let input = input.clone();
    output.respond_with(move |bytes| match Frame::parse(bytes) {
        Some(Frame::IdentityRequest) => input.inject(&INTEGRA_IDENTITY),
        Some(Frame::DataRequest(request)) => {
            let end = request.address.value() + request.size.value();
            let mut at = request.address.value();
            while at < end {
                let len = (chunk as u32).min(end - at);
                let payload = (at..at + len).map(memory_byte).collect();
                let set = DataSet::new(request.device_id, Int7::new(at).unwrap(), payload).unwrap();
                input.inject(&set.encode());
                at += len;
            }
        }
        _ => {}
    });
}
