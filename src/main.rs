use adw::Application;
use adw::prelude::*;
use gtk4::glib;
use tracing_subscriber::EnvFilter;

fn main() -> glib::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = Application::builder()
        .application_id("io.github.tinychat.Gtk")
        .build();
    app.connect_activate(tinychat::ui::build_ui);
    app.run()
}
