//! Renter and administrator accounts.
//!
//! Password hashes are produced and verified elsewhere; they are carried here
//! as opaque strings.

use crate::domain::types::{AdminId, AdminRole, UserId};
use crate::error::{RentalError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const ADULT_AGE: u32 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub driver_license: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `date`, if the birth date is known.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| date.years_since(dob))
    }

    pub fn is_adult_on(&self, date: NaiveDate) -> bool {
        self.age_on(date).is_some_and(|age| age >= ADULT_AGE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub driver_license: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        validate_identity(&self.username, &self.email, &self.password_hash)
    }
}

/// What an administrator may do in the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageVehicles,
    ManageBookings,
    ManagePricing,
    ManageAdmins,
    ViewReports,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }

    pub fn is_admin(&self) -> bool {
        self.role == AdminRole::Admin
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        match self.role {
            AdminRole::SuperAdmin => true,
            AdminRole::Admin => matches!(
                permission,
                Permission::ManageUsers
                    | Permission::ManageVehicles
                    | Permission::ManageBookings
                    | Permission::ViewReports
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
}

impl NewAdmin {
    pub fn validate(&self) -> Result<()> {
        validate_identity(&self.username, &self.email, &self.password_hash)
    }
}

fn validate_identity(username: &str, email: &str, password_hash: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(RentalError::Validation("username is required".to_string()));
    }
    if !email.contains('@') {
        return Err(RentalError::Validation(format!(
            "email address is malformed: {email}"
        )));
    }
    if password_hash.is_empty() {
        return Err(RentalError::Validation(
            "password hash is required".to_string(),
        ));
    }
    Ok(())
}
