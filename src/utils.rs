use chrono::{DateTime, Local, TimeZone};

#[cfg(feature = "gui")]
pub use runtime::*;

#[cfg(feature = "gui")]
mod runtime {
    use once_cell::sync::Lazy;

    pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to build Tokio runtime")
    });

    pub fn runtime_handle() -> tokio::runtime::Handle {
        RUNTIME.handle().clone()
    }
}

/// Adds `http://` to bare `host:port` input; the demo server does not speak TLS.
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Formats epoch seconds in the local timezone.
pub fn format_timestamp(secs: f64) -> String {
    format_timestamp_in(secs, &Local)
}

pub fn format_timestamp_in<Tz>(secs: f64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    match DateTime::from_timestamp(whole as i64, nanos) {
        Some(utc) => utc.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::from("?"),
    }
}
