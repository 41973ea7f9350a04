//! Cookie-backed session store adapter.
//! A keyed store over request/response headers: `get` reads a cookie from the
//! inbound `Cookie` header, `set`/`clear` append `Set-Cookie` entries with the
//! caller's expiry metadata. No validation of the stored value happens here.

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

/// Cookie slot holding the signed session token.
pub const SESSION_COOKIE: &str = "session";
/// One-shot sentinel used to bounce a first-time visitor from login to registration.
pub const FIRST_VISIT_COOKIE: &str = "isFirstVisit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes attached by the caller when storing a cookie.
#[derive(Debug, Clone)]
pub struct CookieAttributes {
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookieAttributes {
    /// Attributes used for the session token cookie. The original stores it
    /// readable from script (`HttpOnly=false`) over plain HTTP; reproduced
    /// as-is rather than hardened.
    pub fn session(expires: DateTime<Utc>) -> Self {
        Self { expires: Some(expires), http_only: false, same_site: SameSite::Lax, secure: false }
    }

    /// Attributes for the `isFirstVisit` sentinel: no expiry metadata.
    pub fn sentinel() -> Self {
        Self { expires: None, http_only: false, same_site: SameSite::Lax, secure: false }
    }
}

/// Read a cookie value from the inbound `Cookie` header.
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

/// Append a `Set-Cookie` entry, overwriting any same-name cookie on the client.
pub fn set(headers: &mut HeaderMap, name: &str, value: &str, attrs: &CookieAttributes) {
    headers.append(SET_COOKIE, cookie_header(name, value, attrs));
}

/// Logically delete a cookie by storing an already-expired entry.
pub fn clear(headers: &mut HeaderMap, name: &str) {
    let hv = HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax; Path=/",
        name
    ))
    .unwrap();
    headers.append(SET_COOKIE, hv);
}

/// True if the response already carries a `Set-Cookie` for this name.
pub fn is_set(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{}=", name);
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

fn cookie_header(name: &str, value: &str, attrs: &CookieAttributes) -> HeaderValue {
    let mut s = format!("{}={}", name, value);
    if let Some(expires) = attrs.expires {
        s.push_str(&format!("; Expires={}", http_date(expires)));
    }
    if attrs.http_only {
        s.push_str("; HttpOnly");
    }
    if attrs.secure {
        s.push_str("; Secure");
    }
    s.push_str(&format!("; SameSite={}; Path=/", attrs.same_site.as_str()));
    HeaderValue::from_str(&s).unwrap()
}

fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
