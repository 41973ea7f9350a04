//! Single-record profile state standing in for a user database.
//! The store holds exactly one `UserData` record; updates are shallow merges
//! of the provided fields, never versioned or duplicated.

use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use crate::tprintln;

/// The one logical user's editable fields. Password is plaintext on purpose:
/// hashing is an explicit non-goal of this demo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserData {
    pub nama: String,
    pub phone: String,
    pub password: String,
}

/// Partial update: only the provided fields overwrite the record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserData {
    fn merge(&mut self, update: UserUpdate) {
        if let Some(nama) = update.nama { self.nama = nama; }
        if let Some(phone) = update.phone { self.phone = phone; }
        if let Some(password) = update.password { self.password = password; }
    }
}

#[derive(Clone, Default)]
pub struct ProfileStore {
    record: Arc<RwLock<UserData>>,
}

impl ProfileStore {
    pub fn new() -> Self { Self::default() }

    /// Shallow-merge the provided fields into the record and return the result.
    pub fn update(&self, update: UserUpdate) -> UserData {
        let mut rec = self.record.write();
        rec.merge(update);
        tprintln!("profile.update nama={}", rec.nama);
        rec.clone()
    }

    /// Replace the whole record (used when reconciling from decoded claims).
    pub fn replace(&self, user: UserData) {
        *self.record.write() = user;
    }

    /// Set all fields to empty string. Used on forced logout when no valid
    /// prior session exists.
    pub fn reset(&self) {
        *self.record.write() = UserData::default();
        tprintln!("profile.reset");
    }

    pub fn snapshot(&self) -> UserData {
        self.record.read().clone()
    }
}

/// Return the name of the first empty field, if any. Mirrors the inline form
/// validation: every listed field is required.
pub fn first_empty_field(fields: &[(&'static str, &str)]) -> Option<&'static str> {
    fields.iter().find(|(_, v)| v.is_empty()).map(|(k, _)| *k)
}

/// Phone numbers are digits only, at most 16 characters; anything else is
/// stripped rather than rejected.
pub fn sanitize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).take(16).collect()
}
