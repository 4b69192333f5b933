//! Client, vehicle and acting-user models resolved through the directory.

use serde::{Deserialize, Serialize};

use super::{RecordId, Role};

/// A customer of the armoring shop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientProfile {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A vehicle owned by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    pub id: RecordId,
    pub client_id: RecordId,
    pub brand: String,
    pub model: String,
    pub year: Option<u16>,
    pub plate: Option<String>,

    /// Ballistic protection level (for example `NIJ III-A`)
    pub protection_level: Option<String>,
}

impl Vehicle {
    /// Short human label such as `BMW X5 (2023)`.
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} {} ({year})", self.brand, self.model),
            None => format!("{} {}", self.brand, self.model),
        }
    }
}

/// The user on whose behalf the controller acts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: RecordId,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
