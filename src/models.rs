use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. `auth_token` holds the current
/// opaque session token; `None` means logged out. The password hash never leaves
/// the application boundary.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub photo_filename: Option<String>,
    pub auth_token: Option<String>,
}

/// Petition
///
/// A petition record from the `petitions` table. A petition is "closed" once its
/// closing date has passed; an absent closing date means it stays open forever.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Petition {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub author_id: i64,
    pub created_date: DateTime<Utc>,
    pub closing_date: Option<DateTime<Utc>>,
    pub photo_filename: Option<String>,
}

impl Petition {
    /// Time-derived state: closed once the closing date is at or before `now`.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.closing_date.is_some_and(|close| close <= now)
    }
}

/// Category
///
/// Fixed reference data from the `categories` table, read-only from this API.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema, Default)]
pub struct Category {
    #[serde(rename = "categoryId")]
    pub id: i64,
    pub name: String,
}

// --- Enriched Query Rows (Output Schemas) ---

/// PetitionOverview
///
/// One row of the petition listing: the petition joined with its author's display
/// name, category name, and current signature count.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetitionOverview {
    pub petition_id: i64,
    pub title: String,
    pub category: String,
    pub author_name: String,
    pub signature_count: i64,
}

/// PetitionDetail
///
/// The full single-petition view, enriched with author location and timestamps.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetitionDetail {
    pub petition_id: i64,
    pub title: String,
    pub description: String,
    pub author_id: i64,
    pub author_name: String,
    pub author_city: Option<String>,
    pub author_country: Option<String>,
    pub signature_count: i64,
    pub category: String,
    pub created_date: DateTime<Utc>,
    pub closing_date: Option<DateTime<Utc>>,
}

/// Signatory
///
/// One signature on a petition, joined with the signer's public profile fields.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Signatory {
    pub signatory_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub signed_date: DateTime<Utc>,
}

/// UserProfile
///
/// Public view of a user. The email is only populated when the caller is viewing
/// their own profile, and is omitted from the JSON entirely otherwise.
#[derive(Debug, Clone, Serialize, ToSchema, Default)]
pub struct UserProfile {
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for POST /users/register. All fields arrive as `Option` so the handler can
/// report *which* required property is missing instead of a generic decode failure.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// LoginRequest
///
/// Input for POST /users/login.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// UpdateUserRequest
///
/// Sparse patch for PATCH /users/{id}. Only fields present in the request are
/// persisted. Changing the password additionally requires `currentPassword`.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// CreatePetitionRequest
///
/// Input for POST /petitions. `category_id` must reference an existing category and
/// `closing_date`, when given, must lie strictly in the future.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreatePetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub closing_date: Option<DateTime<Utc>>,
}

/// UpdatePetitionRequest
///
/// Sparse patch for PATCH /petitions/{id}. At least one field must be present.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub closing_date: Option<DateTime<Utc>>,
}

// --- Response Payloads ---

/// RegisterResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: i64,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: i64,
    pub token: String,
}

/// CreatePetitionResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreatePetitionResponse {
    pub petition_id: i64,
}

// --- Repository Inputs ---

/// NewUser
///
/// Fully validated registration data handed to the repository for insertion.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// NewPetition
#[derive(Debug, Clone, Default)]
pub struct NewPetition {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub author_id: i64,
    pub created_date: DateTime<Utc>,
    pub closing_date: Option<DateTime<Utc>>,
}

/// UserChanges
///
/// Explicit present-field set for the user sparse patch. A `None` field is left
/// untouched by the store.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// PetitionChanges
///
/// Explicit present-field set for the petition sparse patch.
#[derive(Debug, Clone, Default)]
pub struct PetitionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub closing_date: Option<DateTime<Utc>>,
}

/// PetitionFilter
///
/// Store-side filters for the petition listing: equality on category and author,
/// substring match on the title.
#[derive(Debug, Clone, Default)]
pub struct PetitionFilter {
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub q: Option<String>,
}
