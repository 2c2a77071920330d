use serde::{Deserialize, Serialize};

use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::error::DomainError;

/// REST DTO for user representation. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// REST DTO for user list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
}

/// REST DTO for creating a new user. Both fields are required; they are
/// optional here so their absence is reported as a domain error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserReq {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// REST DTO for updating a user (partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserReq {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Plain `{"message": ...}` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

impl From<Vec<User>> for UserListDto {
    fn from(users: Vec<User>) -> Self {
        Self {
            users: users.into_iter().map(UserDto::from).collect(),
        }
    }
}

impl TryFrom<CreateUserReq> for NewUser {
    type Error = DomainError;

    fn try_from(req: CreateUserReq) -> Result<Self, Self::Error> {
        match (req.username, req.email) {
            (Some(username), Some(email)) => Ok(Self { username, email }),
            _ => Err(DomainError::missing_fields()),
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            username: req.username,
            email: req.email,
        }
    }
}
