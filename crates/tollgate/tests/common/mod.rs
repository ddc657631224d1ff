//! A scripted in-process credential server for coordinator tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tollgate::prelude::*;
use tollgate::protocol::ApiResponse;
use tollgate::transport::TransportError;

pub type Answer = Result<ApiResponse, TransportError>;

struct Scripted {
    delay: Duration,
    answer: Answer,
}

/// Answers are queued per endpoint. The last answer in a queue sticks, so
/// one scripted "token valid" serves every background poll.
#[derive(Default)]
pub struct StubTransport {
    login: Mutex<VecDeque<Scripted>>,
    register: Mutex<VecDeque<Scripted>>,
    verify: Mutex<VecDeque<Scripted>>,
    logout: Mutex<VecDeque<Scripted>>,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub cookie_clears: AtomicUsize,
    cookie: AtomicBool,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_login(&self, answer: Answer) -> &Self {
        push(&self.login, Duration::ZERO, answer);
        self
    }

    pub fn on_login_after(&self, delay: Duration, answer: Answer) -> &Self {
        push(&self.login, delay, answer);
        self
    }

    pub fn on_register(&self, answer: Answer) -> &Self {
        push(&self.register, Duration::ZERO, answer);
        self
    }

    pub fn on_verify(&self, answer: Answer) -> &Self {
        push(&self.verify, Duration::ZERO, answer);
        self
    }

    pub fn on_verify_after(&self, delay: Duration, answer: Answer) -> &Self {
        push(&self.verify, delay, answer);
        self
    }

    pub fn on_logout(&self, answer: Answer) -> &Self {
        push(&self.logout, Duration::ZERO, answer);
        self
    }

    pub fn on_logout_after(&self, delay: Duration, answer: Answer) -> &Self {
        push(&self.logout, delay, answer);
        self
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
            + self.register_calls.load(Ordering::SeqCst)
            + self.verify_calls.load(Ordering::SeqCst)
            + self.logout_calls.load(Ordering::SeqCst)
    }
}

fn push(queue: &Mutex<VecDeque<Scripted>>, delay: Duration, answer: Answer) {
    queue.lock().push_back(Scripted { delay, answer });
}

fn next(queue: &Mutex<VecDeque<Scripted>>) -> (Duration, Answer) {
    let mut q = queue.lock();
    let scripted = if q.len() > 1 { q.pop_front() } else { None };
    match scripted {
        Some(s) => (s.delay, s.answer),
        None => match q.front() {
            Some(s) => (s.delay, s.answer.clone()),
            None => (
                Duration::ZERO,
                Err(TransportError::Request("no scripted answer".into())),
            ),
        },
    }
}

async fn answer(queue: &Mutex<VecDeque<Scripted>>) -> Answer {
    let (delay, answer) = next(queue);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    answer
}

impl CredentialTransport for StubTransport {
    async fn login(&self, _request: &LoginRequest) -> Answer {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let answer = answer(&self.login).await;
        if answer.as_ref().is_ok_and(|r| r.code == 1001) {
            self.cookie.store(true, Ordering::SeqCst);
        }
        answer
    }

    async fn register(&self, _request: &RegisterRequest) -> Answer {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let answer = answer(&self.register).await;
        if answer.as_ref().is_ok_and(|r| r.code == 1002) {
            self.cookie.store(true, Ordering::SeqCst);
        }
        answer
    }

    async fn verify_token(&self) -> Answer {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        answer(&self.verify).await
    }

    async fn logout(&self) -> Answer {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        answer(&self.logout).await
    }

    fn clear_session_cookie(&self) {
        self.cookie_clears.fetch_add(1, Ordering::SeqCst);
        self.cookie.store(false, Ordering::SeqCst);
    }
}

// -------------------------------------------------------------------------
// Fixtures
// -------------------------------------------------------------------------

pub fn alice() -> Identity {
    Identity::named("alice")
        .with_id("1")
        .with_email("alice@x.com")
}

pub fn bob() -> Identity {
    Identity::named("bob")
        .with_id("2")
        .with_email("bob@x.com")
        .with_subscribed(true)
}

pub fn login_ok(identity: Identity) -> Answer {
    Ok(ApiResponse::new(1001, "Login successful").with_result(identity))
}

pub fn token_valid(identity: Identity) -> Answer {
    Ok(ApiResponse::new(1040, "Token valid").with_result(identity))
}

pub fn logout_ok() -> Answer {
    Ok(ApiResponse::new(1010, "Logged out"))
}

/// A context over `stub` with in-memory storages the test can inspect.
pub struct Harness {
    pub stub: Arc<StubTransport>,
    pub durable: Arc<MemoryStorage>,
    pub scoped: Arc<MemoryStorage>,
    pub auth: AuthContext<Arc<StubTransport>>,
}

impl Harness {
    pub fn new(stub: Arc<StubTransport>) -> Self {
        Self::with_durable(stub, Arc::new(MemoryStorage::new()))
    }

    pub fn with_durable(stub: Arc<StubTransport>, durable: Arc<MemoryStorage>) -> Self {
        let scoped = Arc::new(MemoryStorage::new());
        let auth = AuthContextBuilder::new()
            .durable_storage(Arc::clone(&durable))
            .scoped_storage(Arc::clone(&scoped))
            .build(Arc::clone(&stub))
            .expect("in-memory context builds");
        Self {
            stub,
            durable,
            scoped,
            auth,
        }
    }

    pub fn snapshot_stored(&self) -> bool {
        self.durable
            .get(self.auth.persistence().key())
            .expect("memory storage never fails")
            .is_some()
    }
}
