//! Fakes for exercising the enricher and pipeline without a network.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Rc,
    time::{Duration, Instant},
};

use super::{enricher::Provider, limiter::Clock};
use crate::{
    error::ProviderError,
    model::{Candidate, Service},
};

#[derive(Default)]
struct ClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// A clock that only moves when told to, or when something sleeps on it.
#[derive(Clone)]
pub struct FakeClock {
    origin: Instant,
    state: Rc<RefCell<ClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Rc::default(),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.state.borrow_mut().elapsed += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.state.borrow().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.borrow_mut();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

#[derive(Clone, Debug)]
pub enum Answer {
    Hit(f64, f64),
    Miss,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub service: Service,
    pub address: String,
    pub at: Instant,
}

/// Shared log of every provider call, in order.
pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Answers from a fixed table keyed by address; unknown addresses miss.
pub struct FakeProvider {
    service: Service,
    answers: BTreeMap<String, Answer>,
    clock: FakeClock,
    latency: Duration,
    calls: CallLog,
}

impl FakeProvider {
    pub fn new(service: Service, clock: &FakeClock, calls: &CallLog) -> Self {
        Self {
            service,
            answers: BTreeMap::new(),
            clock: clock.clone(),
            latency: Duration::from_millis(120),
            calls: Rc::clone(calls),
        }
    }

    pub fn answer(mut self, address: &str, answer: Answer) -> Self {
        self.answers.insert(address.to_string(), answer);
        self
    }
}

impl Provider for FakeProvider {
    fn service(&self) -> Service {
        self.service
    }

    fn resolve(&self, address: &str) -> Result<Option<Candidate>, ProviderError> {
        self.calls.borrow_mut().push(Call {
            service: self.service,
            address: address.to_string(),
            at: self.clock.now(),
        });
        self.clock.advance(self.latency);

        match self.answers.get(address).cloned().unwrap_or(Answer::Miss) {
            Answer::Hit(lat, lon) => Ok(Some(Candidate::new(lat, lon))),
            Answer::Miss => Ok(None),
            Answer::Error => Err(ProviderError::Malformed("scripted failure".to_string())),
        }
    }
}
