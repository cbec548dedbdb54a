//! Live chat session: renders inbound envelopes and forwards local input.

use std::cell::{Cell, RefCell};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::api::events::ChatEvent;
use crate::api::models::{OutgoingChat, TextMessage};
use crate::utils::format_timestamp;

/// Style tag for entries the server echoes back to their author.
pub const SELF_CLASS: &str = "self";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Opened,
    Envelope(ChatEvent),
    /// Carries the close reason when the transport reported one.
    Closed(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub sender_id: String,
    /// `"<name> ~ <time>"`, only on the first entry of a run from one sender.
    pub header: Option<String>,
    pub content: String,
    pub is_self: bool,
}

pub trait ChatView {
    fn set_input_enabled(&self, enabled: bool);
    /// Appends the entry; the view applies the `animate` transition shortly after.
    fn append_entry(&self, entry: &RenderedEntry);
    fn scroll_to_end(&self);
    /// Blocking notice that the session is over.
    fn notify_closed(&self, reason: Option<&str>);
}

/// Groups consecutive messages from one sender under a single header.
pub struct ChatLog {
    prev_sender: Option<String>,
    format_time: fn(f64) -> String,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(format_timestamp)
    }
}

impl ChatLog {
    pub fn new(format_time: fn(f64) -> String) -> Self {
        Self { prev_sender: None, format_time }
    }

    pub fn render(&mut self, message: &TextMessage) -> RenderedEntry {
        let sender = &message.sender;
        let header = (self.prev_sender.as_deref() != Some(sender.id.as_str()))
            .then(|| format!("{} ~ {}", sender.name, (self.format_time)(message.time)));
        self.prev_sender = Some(sender.id.clone());

        RenderedEntry {
            sender_id: sender.id.clone(),
            header,
            content: message.content.clone(),
            is_self: sender.is_self(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing left after trimming.
    Skipped,
    Sent,
    /// The session is not open; the frame was dropped.
    Dropped,
}

pub struct ChatSession<V> {
    view: V,
    outbound: RefCell<Option<UnboundedSender<OutgoingChat>>>,
    state: Cell<SessionState>,
    log: RefCell<ChatLog>,
}

impl<V: ChatView> ChatSession<V> {
    pub fn new(view: V, outbound: UnboundedSender<OutgoingChat>) -> Self {
        Self::with_log(view, outbound, ChatLog::default())
    }

    pub fn with_log(view: V, outbound: UnboundedSender<OutgoingChat>, log: ChatLog) -> Self {
        view.set_input_enabled(false);
        Self {
            view,
            outbound: RefCell::new(Some(outbound)),
            state: Cell::new(SessionState::Connecting),
            log: RefCell::new(log),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn handle(&self, event: SessionEvent) {
        if self.state.get() == SessionState::Closed {
            log::debug!("session closed, ignoring {event:?}");
            return;
        }

        match event {
            SessionEvent::Opened => {
                log::info!("chat session open");
                self.state.set(SessionState::Open);
                self.view.set_input_enabled(true);
            }
            SessionEvent::Envelope(ChatEvent::TextMessage(message)) => {
                let entry = self.log.borrow_mut().render(&message);
                self.view.append_entry(&entry);
                self.view.scroll_to_end();
            }
            SessionEvent::Envelope(ChatEvent::ServerError { error, .. }) => {
                log::warn!("server rejected a chat frame: {error}");
            }
            SessionEvent::Envelope(ChatEvent::Unknown { kind }) => {
                log::warn!("ignoring chat envelope of unknown type {kind:?}");
            }
            SessionEvent::Closed(reason) => {
                let shown = reason.as_deref().unwrap_or("no reason given");
                log::info!("chat session closed: {shown}");
                self.state.set(SessionState::Closed);
                self.view.set_input_enabled(false);
                self.view.notify_closed(reason.as_deref());
            }
        }
    }

    /// Ends the session from our side (window closed, logout). Drops the outbound
    /// channel, which closes the socket, and shows no notice.
    pub fn leave(&self) {
        if self.state.replace(SessionState::Closed) != SessionState::Closed {
            log::info!("leaving chat session");
        }
        self.outbound.borrow_mut().take();
        self.view.set_input_enabled(false);
    }

    /// Feeds transport events into the session until the channel ends.
    pub async fn pump(&self, mut events: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        if self.state.get() != SessionState::Closed {
            self.handle(SessionEvent::Closed(None));
        }
    }

    pub fn send(&self, body: &str) -> SendOutcome {
        let body = body.trim();
        if body.is_empty() {
            return SendOutcome::Skipped;
        }
        if self.state.get() != SessionState::Open {
            log::warn!("dropping chat message, session is {:?}", self.state.get());
            return SendOutcome::Dropped;
        }

        let outbound = self.outbound.borrow();
        let sent = outbound
            .as_ref()
            .is_some_and(|tx| tx.send(OutgoingChat { message: body.to_string() }).is_ok());
        if sent {
            SendOutcome::Sent
        } else {
            log::warn!("dropping chat message, socket task is gone");
            SendOutcome::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Sender;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingView {
        enabled: Cell<bool>,
        entries: RefCell<Vec<RenderedEntry>>,
        scrolls: Cell<usize>,
        closed: RefCell<Vec<Option<String>>>,
    }

    impl ChatView for &RecordingView {
        fn set_input_enabled(&self, enabled: bool) {
            self.enabled.set(enabled);
        }

        fn append_entry(&self, entry: &RenderedEntry) {
            self.entries.borrow_mut().push(entry.clone());
        }

        fn scroll_to_end(&self) {
            self.scrolls.set(self.scrolls.get() + 1);
        }

        fn notify_closed(&self, reason: Option<&str>) {
            self.closed.borrow_mut().push(reason.map(str::to_string));
        }
    }

    fn fixed_time(secs: f64) -> String {
        format!("t{secs}")
    }

    fn text(id: &str, name: &str, content: &str) -> SessionEvent {
        SessionEvent::Envelope(ChatEvent::TextMessage(TextMessage {
            sender: Sender { id: id.into(), name: name.into() },
            time: 1.0,
            content: content.into(),
        }))
    }

    fn session(
        view: &RecordingView,
    ) -> (ChatSession<&RecordingView>, mpsc::UnboundedReceiver<OutgoingChat>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatSession::with_log(view, tx, ChatLog::new(fixed_time)), rx)
    }

    #[test]
    fn input_is_enabled_only_once_open() {
        let view = RecordingView::default();
        let (session, _rx) = session(&view);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!view.enabled.get());

        session.handle(SessionEvent::Opened);
        assert_eq!(session.state(), SessionState::Open);
        assert!(view.enabled.get());
    }

    #[test]
    fn consecutive_messages_share_one_header() {
        let view = RecordingView::default();
        let (session, _rx) = session(&view);
        session.handle(SessionEvent::Opened);

        session.handle(text("1", "Test1", "a"));
        session.handle(text("1", "Test1", "b"));
        session.handle(text("$self", "Test2", "c"));
        session.handle(text("1", "Test1", "d"));

        let headers: Vec<_> = view.entries.borrow().iter().map(|e| e.header.clone()).collect();
        assert_eq!(
            headers,
            vec![
                Some("Test1 ~ t1".to_string()),
                None,
                Some("Test2 ~ t1".to_string()),
                Some("Test1 ~ t1".to_string()),
            ]
        );
        let selfs: Vec<_> = view.entries.borrow().iter().map(|e| e.is_self).collect();
        assert_eq!(selfs, vec![false, false, true, false]);
        assert_eq!(view.scrolls.get(), 4);
    }

    #[test]
    fn non_text_envelopes_render_nothing() {
        let view = RecordingView::default();
        let (session, _rx) = session(&view);
        session.handle(SessionEvent::Opened);
        session.handle(SessionEvent::Envelope(ChatEvent::Unknown { kind: "typing".into() }));
        let server_error = ChatEvent::ServerError { error: "empty message".into(), time: 0.0 };
        session.handle(SessionEvent::Envelope(server_error));
        assert!(view.entries.borrow().is_empty());
    }

    #[test]
    fn send_trims_and_skips_blank_input() {
        let view = RecordingView::default();
        let (session, mut rx) = session(&view);
        session.handle(SessionEvent::Opened);

        assert_eq!(session.send(""), SendOutcome::Skipped);
        assert_eq!(session.send("   "), SendOutcome::Skipped);
        assert!(rx.try_recv().is_err());

        assert_eq!(session.send(" hi "), SendOutcome::Sent);
        let frame = rx.try_recv().unwrap();
        assert_eq!(serde_json::to_string(&frame).unwrap(), r#"{"message":"hi"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_is_terminal_and_notified_once() {
        let view = RecordingView::default();
        let (session, mut rx) = session(&view);
        session.handle(SessionEvent::Opened);
        session.handle(SessionEvent::Closed(Some("bye".into())));
        session.handle(SessionEvent::Opened);
        session.handle(text("1", "Test1", "late"));
        session.handle(SessionEvent::Closed(None));

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!view.enabled.get());
        assert!(view.entries.borrow().is_empty());
        assert_eq!(*view.closed.borrow(), vec![Some("bye".to_string())]);

        assert_eq!(session.send("hello"), SendOutcome::Dropped);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn leaving_closes_quietly_and_releases_the_socket() {
        let view = RecordingView::default();
        let (session, mut rx) = session(&view);
        session.handle(SessionEvent::Opened);
        session.leave();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!view.enabled.get());
        assert!(view.closed.borrow().is_empty());
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));

        session.handle(SessionEvent::Closed(None));
        assert!(view.closed.borrow().is_empty());
    }

    #[tokio::test]
    async fn pump_closes_when_transport_vanishes() {
        let view = RecordingView::default();
        let (session, _rx) = session(&view);
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(SessionEvent::Opened).unwrap();
        tx.send(text("2", "Test2", "hello")).unwrap();
        drop(tx);

        session.pump(events).await;
        assert_eq!(view.entries.borrow().len(), 1);
        assert_eq!(*view.closed.borrow(), vec![None]);
    }
}
