use std::rc::Rc;
use std::time::Duration;

use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::app::Settings;
use crate::chat::{ChatSession, ChatView, RenderedEntry, SELF_CLASS, SessionEvent};

/// Scrolling message list plus input row.
pub struct ChatPane {
    root: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
}

impl ChatPane {
    fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .build();
        let messages = gtk::Box::new(gtk::Orientation::Vertical, 4);
        scroller.set_child(Some(&messages));
        root.append(&scroller);

        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message…"));
        let send_btn = gtk::Button::with_label("Send");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        Self { root, scroller, messages, entry, send_btn }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }
}

impl ChatView for ChatPane {
    fn set_input_enabled(&self, enabled: bool) {
        self.entry.set_sensitive(enabled);
        self.send_btn.set_sensitive(enabled);
        if enabled {
            self.entry.grab_focus();
        }
    }

    fn append_entry(&self, entry: &RenderedEntry) {
        let row = gtk::Box::new(gtk::Orientation::Vertical, 2);
        row.add_css_class("chat-entry");
        if entry.is_self {
            row.add_css_class(SELF_CLASS);
        }

        if let Some(header) = &entry.header {
            let small = gtk::Label::new(Some(header));
            small.add_css_class("caption");
            small.add_css_class("dim-label");
            small.set_halign(gtk::Align::Start);
            row.append(&small);
        }

        let content = gtk::Label::new(Some(&entry.content));
        content.set_wrap(true);
        content.set_selectable(true);
        content.set_xalign(0.0);
        row.append(&content);

        self.messages.append(&row);
        glib::timeout_add_local_once(Duration::from_millis(5), move || {
            row.add_css_class("animate");
        });
    }

    fn scroll_to_end(&self) {
        // The adjustment only grows after the new row is laid out.
        let scroller = self.scroller.clone();
        glib::idle_add_local_once(move || {
            let adj = scroller.vadjustment();
            adj.set_value(adj.upper());
        });
    }

    #[allow(deprecated)]
    fn notify_closed(&self, reason: Option<&str>) {
        let window = self.root.root().and_downcast::<gtk::Window>();
        let dialog = gtk::MessageDialog::builder()
            .modal(true)
            .message_type(gtk::MessageType::Error)
            .buttons(gtk::ButtonsType::Ok)
            .text("WebSocket disconnected")
            .secondary_text(reason.unwrap_or("The chat server closed the connection."))
            .build();
        dialog.set_transient_for(window.as_ref());
        dialog.connect_response(|dialog, _| dialog.close());
        dialog.present();
    }
}

/// Opens the chat socket and wires the pane to a session. The returned session
/// must be `leave()`d when the pane goes away.
pub fn build(client: &ApiClient, settings: &Settings) -> Rc<ChatSession<ChatPane>> {
    let pane = ChatPane::new();

    let runtime = crate::utils::runtime_handle();
    let (events, outbound) = match client.connect_chat(&runtime, &settings.socket_path) {
        Ok(channels) => (channels.events, channels.outbound),
        Err(e) => {
            log::warn!("could not start chat socket: {e}");
            let (tx, events) = mpsc::unbounded_channel();
            let _ = tx.send(SessionEvent::Closed(Some(e.to_string())));
            (events, mpsc::unbounded_channel().0)
        }
    };

    let session = Rc::new(ChatSession::new(pane, outbound));

    {
        let session = session.clone();
        glib::MainContext::default().spawn_local(async move { session.pump(events).await });
    }

    let send = {
        let session = session.clone();
        Rc::new(move || {
            let entry = &session.view().entry;
            let body = entry.text().to_string();
            entry.set_text("");
            session.send(&body);
        })
    };
    {
        let send = send.clone();
        session.view().send_btn.connect_clicked(move |_| (send)());
    }
    session.view().entry.connect_activate(move |_| (send)());

    session
}
