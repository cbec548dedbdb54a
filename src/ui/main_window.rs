use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use gtk4::glib;

use crate::api::ApiClient;
use crate::app::Settings;

pub fn show_main_window(app: &Application, client: ApiClient, settings: Settings) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("tinychat")
        .default_width(720)
        .default_height(560)
        .build();

    let chat = crate::ui::chat_view::build(&client, &settings);
    let board = crate::ui::board_view::build(&client, &settings);

    let stack = gtk::Stack::new();
    stack.add_titled(&chat.view().widget(), Some("chat"), "Live chat");
    stack.add_titled(&board.view().widget(), Some("board"), "Message board");
    stack.set_vexpand(true);

    let switcher = gtk::StackSwitcher::new();
    switcher.set_stack(Some(&stack));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    header.set_title_widget(Some(&switcher));

    let logout_btn = gtk::Button::with_label("Log out");
    header.pack_end(&logout_btn);
    container.append(&header);
    container.append(&stack);
    window.set_content(Some(&container));

    {
        let chat = chat.clone();
        window.connect_close_request(move |_| {
            chat.leave();
            glib::Propagation::Proceed
        });
    }

    {
        let app = app.clone();
        let window = window.clone();
        logout_btn.connect_clicked(move |btn| {
            btn.set_sensitive(false);
            chat.leave();
            let app = app.clone();
            let window = window.clone();
            let client = client.clone();
            let settings = settings.clone();
            glib::MainContext::default().spawn_local(async move {
                if let Err(e) = client.logout().await {
                    log::warn!("logout request failed: {e}");
                }
                crate::ui::login::show_login_window(&app, client, settings);
                window.close();
            });
        });
    }

    window.present();
}
