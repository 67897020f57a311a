//! JSON:API request and response documents.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ACCOUNTS_TYPE: &str = "accounts";

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterDocument {
    pub data: RegisterData,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterData {
    #[serde(rename = "type")]
    pub kind: String,
    /// Must be absent; identifiers are allocated by the service.
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: RegisterAttributes,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RegisterAttributes {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct UpdateDocument {
    pub data: UpdateData,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct UpdateData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: UpdateAttributes,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateAttributes {
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub name: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChangePasswordDocument {
    pub data: ChangePasswordData,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChangePasswordData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: ChangePasswordAttributes,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ChangePasswordAttributes {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirmation: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountDocument {
    pub links: Links,
    pub data: AccountResource,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: AccountAttributes,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountAttributes {
    pub name: String,
    pub nickname: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
}
