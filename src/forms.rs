//! Login/register forms: tab switching, client-side validation and submission.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::future::Future;

use crate::api::models::FormReply;
use crate::error::Result;

/// Input name to value, collected from one form.
pub type FormRecord = BTreeMap<String, String>;

/// Returns the message to show when the record is rejected.
pub type Validator = fn(&FormRecord) -> std::result::Result<(), String>;

pub const LOGIN_ENDPOINT: &str = "/login";
pub const REGISTER_ENDPOINT: &str = "/register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Login,
    Register,
}

impl Tab {
    pub fn endpoint(self) -> &'static str {
        match self {
            Tab::Login => LOGIN_ENDPOINT,
            Tab::Register => REGISTER_ENDPOINT,
        }
    }
}

pub trait FormView {
    /// `None` hides the error banner.
    fn show_error(&self, message: Option<&str>);
    fn reset_forms(&self);
    /// Marks exactly one tab and its form active.
    fn activate_tab(&self, tab: Tab);
    fn navigate(&self, location: &str);
}

/// Raw outcome of a form POST.
#[derive(Debug, Clone, PartialEq)]
pub struct FormResponse {
    pub status: u16,
    pub reason: String,
    /// Parsed body of a 200 reply, `None` when it was not valid JSON.
    pub reply: Option<FormReply>,
}

pub trait FormSubmitter {
    fn post_form(
        &self,
        endpoint: &str,
        record: &FormRecord,
    ) -> impl Future<Output = Result<FormResponse>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(String),
    Failed(String),
    Navigated,
}

fn field<'a>(record: &'a FormRecord, name: &str) -> &'a str {
    record.get(name).map_or("", String::as_str)
}

pub fn login_validator(record: &FormRecord) -> std::result::Result<(), String> {
    if field(record, "username").is_empty() {
        return Err("Username should not be empty".into());
    }
    if field(record, "password").is_empty() {
        return Err("Password should not be empty".into());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterRules {
    /// When false, mismatched `password1`/`password2` pass, as the server also lets them.
    pub compare_passwords: bool,
}

impl RegisterRules {
    pub fn check(self, record: &FormRecord) -> std::result::Result<(), String> {
        if utf16_len(field(record, "username")) < 3 {
            return Err("Username should be at least 3 characters long".into());
        }
        if utf16_len(field(record, "password1")) < 8 {
            return Err("Password should be at least 8 characters long".into());
        }
        if self.compare_passwords && field(record, "password1") != field(record, "password2") {
            return Err("The passwords should be equal".into());
        }
        if field(record, "displayname").is_empty() {
            return Err("Displayname should not be empty".into());
        }
        Ok(())
    }
}

/// Length as a browser reports it, in UTF-16 code units.
fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

pub fn register_validator(record: &FormRecord) -> std::result::Result<(), String> {
    RegisterRules::default().check(record)
}

fn strict_register_validator(record: &FormRecord) -> std::result::Result<(), String> {
    RegisterRules { compare_passwords: true }.check(record)
}

pub struct FormController<V, S> {
    view: V,
    submitter: S,
    current: Cell<Tab>,
    rules: RegisterRules,
    home: String,
}

impl<V: FormView, S: FormSubmitter> FormController<V, S> {
    pub fn new(view: V, submitter: S, home: impl Into<String>) -> Self {
        Self {
            view,
            submitter,
            current: Cell::new(Tab::Login),
            rules: RegisterRules::default(),
            home: home.into(),
        }
    }

    pub fn with_rules(mut self, rules: RegisterRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn current_tab(&self) -> Tab {
        self.current.get()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn switch_tab(&self, tab: Tab) {
        if tab == self.current.get() {
            return;
        }
        self.current.set(tab);
        self.view.reset_forms();
        self.view.show_error(None);
        self.view.activate_tab(tab);
    }

    pub fn validator(&self, tab: Tab) -> Validator {
        match tab {
            Tab::Login => login_validator,
            Tab::Register if self.rules.compare_passwords => strict_register_validator,
            Tab::Register => register_validator,
        }
    }

    /// Submits the record with the tab's endpoint and validator.
    pub async fn submit(&self, tab: Tab, record: FormRecord) -> SubmitOutcome {
        self.submit_with(record, tab.endpoint(), self.validator(tab)).await
    }

    pub async fn submit_with(
        &self,
        record: FormRecord,
        endpoint: &str,
        validator: Validator,
    ) -> SubmitOutcome {
        if let Err(message) = validator(&record) {
            return self.fail(SubmitOutcome::Rejected(message));
        }

        let response = match self.submitter.post_form(endpoint, &record).await {
            Ok(response) => response,
            Err(e) => return self.fail(SubmitOutcome::Failed(format!("Server unreachable: {e}"))),
        };

        if response.status != 200 {
            return self.fail(SubmitOutcome::Failed(format!(
                "Server responded: {} {}",
                response.status, response.reason
            )));
        }

        let Some(reply) = response.reply else {
            let message = "Server responded with an unreadable body".to_string();
            return self.fail(SubmitOutcome::Failed(message));
        };

        if let Some(error) = reply.error_message() {
            return self.fail(SubmitOutcome::Failed(format!("Server error: {error}")));
        }

        log::info!("{endpoint} accepted, navigating to {}", self.home);
        self.view.navigate(&self.home);
        SubmitOutcome::Navigated
    }

    fn fail(&self, outcome: SubmitOutcome) -> SubmitOutcome {
        if let SubmitOutcome::Rejected(message) | SubmitOutcome::Failed(message) = &outcome {
            log::warn!("form error: {message}");
            self.view.show_error(Some(message));
        }
        outcome
    }
}
