//! Scripted in-memory client for coordinator and scheduler tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{NoticeboardError, Result};
use crate::client::{FetchParams, NotificationClient, NotificationPage};
use crate::domain::NotificationCount;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List(FetchParams),
    Count,
    MarkRead(String),
    MarkAllRead,
    Delete(String),
}

#[derive(Default)]
struct Script {
    pages: VecDeque<Result<NotificationPage>>,
    counts: VecDeque<Result<NotificationCount>>,
    mutations: VecDeque<Result<()>>,
    default_count: NotificationCount,
    list_delay: Duration,
    count_delay: Duration,
    calls: Vec<Call>,
}

/// Pops scripted responses in order; once a queue is drained, list returns
/// an empty page, count returns the default count and mutations succeed.
#[derive(Default)]
pub(crate) struct FakeClient {
    script: Mutex<Script>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: Result<NotificationPage>) {
        self.script.lock().unwrap().pages.push_back(page);
    }

    pub fn push_count(&self, count: Result<NotificationCount>) {
        self.script.lock().unwrap().counts.push_back(count);
    }

    pub fn push_mutation(&self, result: Result<()>) {
        self.script.lock().unwrap().mutations.push_back(result);
    }

    pub fn set_default_count(&self, count: NotificationCount) {
        self.script.lock().unwrap().default_count = count;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.script.lock().unwrap().list_delay = delay;
    }

    pub fn set_count_delay(&self, delay: Duration) {
        self.script.lock().unwrap().count_delay = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Count).count()
    }

    fn record(&self, call: Call) {
        self.script.lock().unwrap().calls.push(call);
    }

    fn next_mutation(&self) -> Result<()> {
        self.script
            .lock()
            .unwrap()
            .mutations
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

pub(crate) fn network_error() -> NoticeboardError {
    NoticeboardError::Network("connection reset".into())
}

#[async_trait]
impl NotificationClient for FakeClient {
    async fn list(&self, params: &FetchParams) -> Result<NotificationPage> {
        self.record(Call::List(*params));
        let (delay, response) = {
            let mut script = self.script.lock().unwrap();
            let response = script
                .pages
                .pop_front()
                .unwrap_or_else(|| Ok(NotificationPage::default()));
            (script.list_delay, response)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn count(&self) -> Result<NotificationCount> {
        self.record(Call::Count);
        let (delay, response) = {
            let mut script = self.script.lock().unwrap();
            let default = script.default_count;
            let response = script.counts.pop_front().unwrap_or(Ok(default));
            (script.count_delay, response)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        self.record(Call::MarkRead(id.to_string()));
        self.next_mutation()
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.record(Call::MarkAllRead);
        self.next_mutation()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(Call::Delete(id.to_string()));
        self.next_mutation()
    }
}
