//! Request and response bodies of the sample service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

use super::entities::{company, position, user};
use crate::validation::{
    Validatable, ValidationError, ValidationErrors,
    validators::{validate_length, validate_range},
};

fn check_name(errors: &mut ValidationErrors, field: &str, value: &str) {
    errors.check(validate_length(field, value, Some(1), Some(32)));
}

fn check_level(errors: &mut ValidationErrors, level: i32) {
    errors.check(validate_range(
        "level",
        level,
        Some(*position::LEVELS.start()),
        Some(*position::LEVELS.end()),
    ));
}

// Company

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanySchema {
    pub id: i32,
    pub name: String,
}

impl From<company::Model> for CompanySchema {
    fn from(model: company::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanyCreate {
    pub name: String,
}

impl Validatable for CompanyCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "name", &self.name);
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CompanyUpdate {
    #[serde(default)]
    pub name: Option<String>,
}

impl Validatable for CompanyUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, "name", name);
        }
        errors.result()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanyAddUser {
    pub uid: String,
    pub position_id: i32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompanyQuery {
    pub company_id: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanyIncludeUsers {
    pub id: i32,
    pub name: String,
    pub users: Vec<UserIncludePosition>,
}

// Position

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PositionBrief {
    pub id: i32,
    pub name: String,
}

impl From<position::Model> for PositionBrief {
    fn from(model: position::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PositionSchema {
    pub id: i32,
    pub name: String,
    /// 1 is the highest level
    pub level: i32,
    pub company_id: i32,
    pub higher_id: Option<i32>,
}

impl From<position::Model> for PositionSchema {
    fn from(model: position::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            level: model.level,
            company_id: model.company_id,
            higher_id: model.higher_id,
        }
    }
}

/// Second level of a position tree
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PositionBranch {
    pub id: i32,
    pub name: String,
    pub level: i32,
    pub company_id: i32,
    pub higher_id: Option<i32>,
    pub lowers: Vec<PositionSchema>,
}

/// A position with two levels of lower positions
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PositionTree {
    pub id: i32,
    pub name: String,
    pub level: i32,
    pub company_id: i32,
    pub higher_id: Option<i32>,
    pub lowers: Vec<PositionBranch>,
}

impl PositionBranch {
    #[must_use]
    pub fn new(model: position::Model, lowers: Vec<PositionSchema>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            level: model.level,
            company_id: model.company_id,
            higher_id: model.higher_id,
            lowers,
        }
    }
}

impl PositionTree {
    #[must_use]
    pub fn new(model: position::Model, lowers: Vec<PositionBranch>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            level: model.level,
            company_id: model.company_id,
            higher_id: model.higher_id,
            lowers,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PositionCreate {
    pub name: String,
    pub level: i32,
    pub company_id: i32,
    #[serde(default)]
    pub higher_id: Option<i32>,
}

impl Validatable for PositionCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "name", &self.name);
        check_level(&mut errors, self.level);
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PositionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub higher_id: Option<i32>,
}

impl Validatable for PositionUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, "name", name);
        }
        if let Some(level) = self.level {
            check_level(&mut errors, level);
        }
        errors.result()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddLowers {
    pub lowers: BTreeSet<i32>,
}

impl Validatable for AddLowers {}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TreeQuery {
    pub company_id: Option<i32>,
    pub level: Option<i32>,
}

// User

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PositionInUser {
    pub id: i32,
    pub name: String,
    pub level: i32,
    pub higher: Option<PositionBrief>,
    pub lowers: Vec<PositionBrief>,
}

/// A user with their company and position
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    pub uid: String,
    pub username: String,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub company_id: Option<i32>,
    pub position_id: Option<i32>,
    pub full_name: String,
    pub company: Option<CompanySchema>,
    pub position: Option<PositionInUser>,
}

impl UserDetail {
    #[must_use]
    pub fn new(
        model: user::Model,
        company: Option<CompanySchema>,
        position: Option<PositionInUser>,
    ) -> Self {
        Self {
            full_name: model.full_name(),
            uid: model.uid,
            username: model.username,
            name: model.name,
            family_name: model.family_name,
            company_id: model.company_id,
            position_id: model.position_id,
            company,
            position,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserIncludePosition {
    pub uid: String,
    pub username: String,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub company_id: Option<i32>,
    pub position_id: Option<i32>,
    pub full_name: String,
    pub position: Option<PositionBrief>,
}

impl UserIncludePosition {
    #[must_use]
    pub fn new(model: user::Model, position: Option<PositionBrief>) -> Self {
        Self {
            full_name: model.full_name(),
            uid: model.uid,
            username: model.username,
            name: model.name,
            family_name: model.family_name,
            company_id: model.company_id,
            position_id: model.position_id,
            position,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub password_again: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub user_number: Option<i32>,
}

impl Validatable for UserCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "username", &self.username);
        errors.check(validate_length("password", &self.password, Some(1), None));
        if self.password_again != self.password {
            errors.add(ValidationError::new("password_again", "Passwords do not match"));
        }
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_again: Option<String>,
}

impl Validatable for UserUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(username) = &self.username {
            check_name(&mut errors, "username", username);
        }
        if self.password.is_some() && self.password_again != self.password {
            errors.add(ValidationError::new("password_again", "Passwords do not match"));
        }
        errors.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_create_requires_matching_passwords() {
        let mut body = UserCreate {
            username: "jdoe".to_string(),
            password: "secret".to_string(),
            password_again: "secret".to_string(),
            name: None,
            family_name: None,
            user_number: None,
        };
        assert!(body.validate().is_ok());

        body.password_again = "other".to_string();
        let errors = body.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_user_update_checks_password_only_when_given() {
        let body = UserUpdate {
            name: Some("John".to_string()),
            ..UserUpdate::default()
        };
        assert!(body.validate().is_ok());

        let body = UserUpdate {
            password: Some("new".to_string()),
            ..UserUpdate::default()
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_position_level_range() {
        let body = PositionCreate {
            name: "CEO".to_string(),
            level: 8,
            company_id: 1,
            higher_id: None,
        };
        assert!(body.validate().is_err());

        let update = PositionUpdate {
            level: Some(0),
            ..PositionUpdate::default()
        };
        assert!(update.validate().is_err());
        assert!(PositionUpdate::default().validate().is_ok());
    }
}
