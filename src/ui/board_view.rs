use std::rc::Rc;
use std::time::Duration;

use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;

use crate::api::ApiClient;
use crate::app::Settings;
use crate::board::{BoardView, MessageBoard};

pub struct BoardPane {
    root: gtk::Box,
    list: gtk::ListBox,
    entry: gtk::Entry,
    post_btn: gtk::Button,
    refresh_btn: gtk::Button,
}

impl BoardPane {
    fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder().vexpand(true).hexpand(true).build();
        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::None);
        list.add_css_class("boxed-list");
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("New message"));
        let post_btn = gtk::Button::with_label("Post");
        post_btn.add_css_class("suggested-action");
        let refresh_btn = gtk::Button::from_icon_name("view-refresh-symbolic");
        refresh_btn.set_tooltip_text(Some("Refresh"));
        input_row.append(&entry);
        input_row.append(&post_btn);
        input_row.append(&refresh_btn);
        root.append(&input_row);

        Self { root, list, entry, post_btn, refresh_btn }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }
}

impl BoardView for BoardPane {
    fn show_messages(&self, messages: &[String]) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for message in messages {
            let label = gtk::Label::new(Some(message));
            label.set_margin_top(8);
            label.set_margin_bottom(8);
            label.set_margin_start(8);
            label.set_margin_end(8);
            label.set_halign(gtk::Align::Start);
            label.set_wrap(true);
            self.list.append(&label);
        }
    }

    fn clear_input(&self) {
        self.entry.set_text("");
    }
}

type Board = MessageBoard<BoardPane, ApiClient>;

fn spawn_refresh(board: &Rc<Board>) {
    let board = board.clone();
    glib::MainContext::default().spawn_local(async move {
        board.refresh().await;
    });
}

pub fn build(client: &ApiClient, settings: &Settings) -> Rc<Board> {
    let board = Rc::new(MessageBoard::new(BoardPane::new(), client.clone()));

    let post = {
        let board = board.clone();
        Rc::new(move || {
            let message = board.view().entry.text().to_string();
            let board = board.clone();
            glib::MainContext::default().spawn_local(async move {
                board.post(&message).await;
            });
        })
    };
    {
        let post = post.clone();
        board.view().post_btn.connect_clicked(move |_| (post)());
    }
    board.view().entry.connect_activate(move |_| (post)());

    let board_for_refresh = board.clone();
    board.view().refresh_btn.connect_clicked(move |_| spawn_refresh(&board_for_refresh));

    if let Some(secs) = settings.poll_interval_secs.filter(|s| *s > 0) {
        let weak = Rc::downgrade(&board);
        glib::timeout_add_local(Duration::from_secs(secs), move || match weak.upgrade() {
            // Stop once the pane has left its window.
            Some(board) if board.view().root.root().is_some() => {
                spawn_refresh(&board);
                glib::ControlFlow::Continue
            }
            _ => glib::ControlFlow::Break,
        });
    }

    spawn_refresh(&board);
    board
}
