pub mod board_view;
pub mod chat_view;
pub mod login;
pub mod main_window;

use adw::Application;
use gtk4 as gtk;

use crate::api::ApiClient;
use crate::app::Settings;

const CSS: &str = r#"
.chat-entry {
    padding: 4px 10px;
    opacity: 0.3;
    transition: opacity 150ms ease-in;
}
.chat-entry.animate {
    opacity: 1;
}
.chat-entry.self {
    background-color: alpha(@accent_bg_color, 0.15);
    border-radius: 8px;
}
.form-error {
    color: @error_color;
}
"#;

fn load_css() {
    let provider = gtk::CssProvider::new();
    provider.load_from_data(CSS);
    match gtk::gdk::Display::default() {
        Some(display) => gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => log::warn!("no display, skipping stylesheet"),
    }
}

pub fn build_ui(app: &Application) {
    load_css();

    let mut settings = Settings::load();
    let client = match ApiClient::new(&settings.server_url) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("bad server_url {:?}: {e}, using the default", settings.server_url);
            settings.server_url = Settings::default().server_url;
            match ApiClient::new(&settings.server_url) {
                Ok(client) => client,
                Err(e) => {
                    log::error!("could not build HTTP client: {e}");
                    return;
                }
            }
        }
    };

    login::show_login_window(app, client.with_runtime(crate::utils::runtime_handle()), settings);
}
