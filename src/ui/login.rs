use std::rc::Rc;

use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use gtk4::glib;

use crate::api::ApiClient;
use crate::app::Settings;
use crate::forms::{FormController, FormRecord, FormView, RegisterRules, SubmitOutcome, Tab};

type Fields = Vec<(&'static str, gtk::Editable)>;

/// The login window's widgets, driven by a `FormController`.
pub struct LoginPage {
    app: Application,
    window: adw::ApplicationWindow,
    client: ApiClient,
    settings: Settings,
    stack: gtk::Stack,
    login_tab: gtk::ToggleButton,
    register_tab: gtk::ToggleButton,
    login_fields: Fields,
    register_fields: Fields,
    banner: gtk::Label,
}

impl LoginPage {
    fn fields(&self, tab: Tab) -> &Fields {
        match tab {
            Tab::Login => &self.login_fields,
            Tab::Register => &self.register_fields,
        }
    }

    /// Every input of the form, by name.
    pub fn record(&self, tab: Tab) -> FormRecord {
        self.fields(tab)
            .iter()
            .map(|(name, field)| (name.to_string(), field.text().to_string()))
            .collect()
    }
}

impl FormView for LoginPage {
    fn show_error(&self, message: Option<&str>) {
        match message {
            Some(message) => {
                self.banner.set_label(message);
                self.banner.set_visible(true);
            }
            None => self.banner.set_visible(false),
        }
    }

    fn reset_forms(&self) {
        for (_, field) in self.login_fields.iter().chain(&self.register_fields) {
            field.set_text("");
        }
    }

    fn activate_tab(&self, tab: Tab) {
        let (name, button) = match tab {
            Tab::Login => ("login", &self.login_tab),
            Tab::Register => ("register", &self.register_tab),
        };
        self.stack.set_visible_child_name(name);
        button.set_active(true);
    }

    fn navigate(&self, location: &str) {
        log::info!("signed in, opening {location}");
        let (client, settings) = (self.client.clone(), self.settings.clone());
        crate::ui::main_window::show_main_window(&self.app, client, settings);
        self.window.close();
    }
}

fn entry(placeholder: &str) -> gtk::Editable {
    let entry = gtk::Entry::new();
    entry.set_placeholder_text(Some(placeholder));
    entry.set_hexpand(true);
    entry.upcast()
}

fn password(placeholder: &str) -> gtk::Editable {
    let entry = gtk::PasswordEntry::new();
    entry.set_placeholder_text(Some(placeholder));
    entry.set_show_peek_icon(true);
    entry.set_hexpand(true);
    entry.upcast()
}

fn form_box(fields: &Fields, submit: &gtk::Button) -> gtk::Box {
    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    for (_, field) in fields {
        form.append(field);
    }
    submit.add_css_class("suggested-action");
    submit.set_halign(gtk::Align::End);
    form.append(submit);
    form
}

pub fn show_login_window(app: &Application, client: ApiClient, settings: Settings) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("tinychat")
        .default_width(420)
        .default_height(340)
        .resizable(false)
        .build();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    // Tabs
    let login_tab = gtk::ToggleButton::with_label("Login");
    let register_tab = gtk::ToggleButton::with_label("Register");
    register_tab.set_group(Some(&login_tab));
    login_tab.set_active(true);
    let tabs = gtk::Box::new(gtk::Orientation::Horizontal, 0);
    tabs.add_css_class("linked");
    tabs.set_halign(gtk::Align::Center);
    tabs.append(&login_tab);
    tabs.append(&register_tab);
    root.append(&tabs);

    let login_fields: Fields =
        vec![("username", entry("Username")), ("password", password("Password"))];
    let register_fields: Fields = vec![
        ("username", entry("Username")),
        ("password1", password("Password")),
        ("password2", password("Repeat password")),
        ("displayname", entry("Display name")),
    ];
    if let Some(name) = &settings.username {
        login_fields[0].1.set_text(name);
    }

    let login_btn = gtk::Button::with_label("Log in");
    let register_btn = gtk::Button::with_label("Register");
    let stack = gtk::Stack::new();
    stack.set_transition_type(gtk::StackTransitionType::Crossfade);
    stack.add_named(&form_box(&login_fields, &login_btn), Some("login"));
    stack.add_named(&form_box(&register_fields, &register_btn), Some("register"));
    stack.set_visible_child_name("login");
    root.append(&stack);

    let banner = gtk::Label::new(None);
    banner.add_css_class("form-error");
    banner.set_halign(gtk::Align::Start);
    banner.set_wrap(true);
    banner.set_visible(false);
    root.append(&banner);

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("tinychat"));
    header.set_title_widget(Some(&title));
    container.append(&header);
    container.append(&root);
    window.set_content(Some(&container));

    let rules = RegisterRules { compare_passwords: settings.compare_passwords };
    let home = settings.home_path.clone();
    let page = LoginPage {
        app: app.clone(),
        window: window.clone(),
        client: client.clone(),
        settings,
        stack,
        login_tab: login_tab.clone(),
        register_tab: register_tab.clone(),
        login_fields,
        register_fields,
        banner,
    };
    let controller = Rc::new(FormController::new(page, client, home).with_rules(rules));

    for (button, tab) in [(&login_tab, Tab::Login), (&register_tab, Tab::Register)] {
        let controller = controller.clone();
        button.connect_toggled(move |b| {
            if b.is_active() {
                controller.switch_tab(tab);
            }
        });
    }

    let submit: Rc<dyn Fn(Tab)> = {
        let controller = controller.clone();
        Rc::new(move |tab| {
            let record = controller.view().record(tab);
            let controller = controller.clone();
            glib::MainContext::default().spawn_local(async move {
                let username = record.get("username").cloned();
                let outcome = controller.submit(tab, record).await;
                if outcome == SubmitOutcome::Navigated && tab == Tab::Login {
                    let mut settings = Settings::load();
                    settings.username = username;
                    if let Err(e) = settings.save() {
                        log::warn!("could not remember username: {e}");
                    }
                }
            });
        })
    };

    for (button, tab) in [(&login_btn, Tab::Login), (&register_btn, Tab::Register)] {
        let submit = submit.clone();
        button.connect_clicked(move |_| (submit)(tab));
    }
    // Enter in any field submits its form
    for tab in [Tab::Login, Tab::Register] {
        for (_, field) in controller.view().fields(tab) {
            let submit = submit.clone();
            if let Some(entry) = field.downcast_ref::<gtk::Entry>() {
                entry.connect_activate(move |_| (submit)(tab));
            } else if let Some(entry) = field.downcast_ref::<gtk::PasswordEntry>() {
                entry.connect_activate(move |_| (submit)(tab));
            }
        }
    }

    window.present();
}
