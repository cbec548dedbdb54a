//! Poll-rendered message board: `GET /messages` replaces the whole list,
//! `POST /messages` adds one and refreshes on `201 Created`.

use std::future::Future;

use crate::api::models::{MessageList, NewMessage};
use crate::error::Result;

pub const CREATED: u16 = 201;

/// Widgets the board renders into.
pub trait BoardView {
    fn show_messages(&self, messages: &[String]);
    fn clear_input(&self);
}

/// Transport for the message resource.
pub trait MessageSource {
    /// Resolves to the message list, or an error for any non-200 status or bad body.
    fn fetch_messages(&self) -> impl Future<Output = Result<MessageList>>;
    /// Resolves to the response status.
    fn create_message(&self, message: &NewMessage) -> impl Future<Output = Result<u16>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Empty input, nothing sent.
    Skipped,
    Created,
    /// Any other status, or a transport failure. Not surfaced to the user.
    Failed,
}

pub struct MessageBoard<V, S> {
    view: V,
    source: S,
}

impl<V: BoardView, S: MessageSource> MessageBoard<V, S> {
    pub fn new(view: V, source: S) -> Self {
        Self { view, source }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Re-renders the list. Returns whether anything was rendered; failures are dropped.
    pub async fn refresh(&self) -> bool {
        match self.source.fetch_messages().await {
            Ok(list) => {
                self.view.show_messages(&list.messages);
                true
            }
            Err(e) => {
                log::debug!("refresh abandoned: {e}");
                false
            }
        }
    }

    pub async fn post(&self, message: &str) -> PostOutcome {
        if message.is_empty() {
            return PostOutcome::Skipped;
        }

        let body = NewMessage { message: message.to_string() };
        let pending = self.source.create_message(&body);
        self.view.clear_input();

        match pending.await {
            Ok(CREATED) => {
                self.refresh().await;
                PostOutcome::Created
            }
            Ok(status) => {
                log::debug!("post not accepted: status {status}");
                PostOutcome::Failed
            }
            Err(e) => {
                log::debug!("post failed: {e}");
                PostOutcome::Failed
            }
        }
    }
}
