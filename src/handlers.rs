use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    AppState,
    auth::{self, AuthUser, MaybeAuthUser},
    error::ApiError,
    models::{
        Category, CreatePetitionRequest, CreatePetitionResponse, LoginRequest, LoginResponse,
        NewPetition, NewUser, PetitionChanges, PetitionDetail, PetitionFilter, PetitionOverview,
        RegisterRequest, RegisterResponse, Signatory, UpdatePetitionRequest, UpdateUserRequest,
        User, UserChanges, UserProfile,
    },
    photos::{ImageType, derive_filename},
};

// --- Validation Helpers ---

/// Unwraps a required string field, rejecting absent or empty values.
fn require_string(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        None => Err(ApiError::BadRequest(format!(
            "data should have required property '{field}'"
        ))),
        Some(s) if s.is_empty() => Err(ApiError::BadRequest(format!("data.{field} is invalid"))),
        Some(s) => Ok(s),
    }
}

/// A field that is present must still be a non-empty string.
fn check_optional_string(value: &Option<String>, field: &str) -> Result<(), ApiError> {
    if value.as_deref() == Some("") {
        return Err(ApiError::BadRequest(format!("data.{field} is invalid")));
    }
    Ok(())
}

/// Permissive email shape check: some '@' with non-whitespace on both sides.
pub fn is_valid_email(email: &str) -> bool {
    email.char_indices().any(|(idx, ch)| {
        ch == '@'
            && email[..idx].chars().next_back().is_some_and(|c| !c.is_whitespace())
            && email[idx + 1..].chars().next().is_some_and(|c| !c.is_whitespace())
    })
}

// --- Petition Listing Order ---

/// SortMode
///
/// The four accepted orderings for the petition listing. Every mode is a total
/// order: ties break on petition id ascending, so repeated calls are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    AlphabeticalAsc,
    AlphabeticalDesc,
    SignaturesAsc,
    SignaturesDesc,
}

impl SortMode {
    /// Case-insensitive parse of the `sortBy` query parameter.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ALPHABETICAL_ASC" => Some(SortMode::AlphabeticalAsc),
            "ALPHABETICAL_DESC" => Some(SortMode::AlphabeticalDesc),
            "SIGNATURES_ASC" => Some(SortMode::SignaturesAsc),
            "SIGNATURES_DESC" => Some(SortMode::SignaturesDesc),
            _ => None,
        }
    }
}

/// Sorts listing rows in memory under the requested mode, id-ascending tie-break.
pub fn sort_petitions(rows: &mut [PetitionOverview], mode: SortMode) {
    match mode {
        SortMode::AlphabeticalAsc => rows.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.petition_id.cmp(&b.petition_id))
        }),
        SortMode::AlphabeticalDesc => rows.sort_by(|a, b| {
            b.title
                .cmp(&a.title)
                .then_with(|| a.petition_id.cmp(&b.petition_id))
        }),
        SortMode::SignaturesAsc => rows.sort_by(|a, b| {
            a.signature_count
                .cmp(&b.signature_count)
                .then_with(|| a.petition_id.cmp(&b.petition_id))
        }),
        SortMode::SignaturesDesc => rows.sort_by(|a, b| {
            b.signature_count
                .cmp(&a.signature_count)
                .then_with(|| a.petition_id.cmp(&b.petition_id))
        }),
    }
}

/// Applies pagination after sorting: skip `start_index`, keep at most `count`.
/// Indices are 0-based and clamp naturally; out-of-range skip yields an empty list.
pub fn paginate<T>(rows: Vec<T>, start_index: Option<i64>, count: Option<i64>) -> Vec<T> {
    rows.into_iter()
        .skip(start_index.unwrap_or(0) as usize)
        .take(count.map_or(usize::MAX, |c| c as usize))
        .collect()
}

// --- User Handlers ---

/// register
///
/// [Public Route] Creates a new account. The password is argon2-hashed before it
/// reaches the store; a duplicate email surfaces as a typed conflict, not a 500.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Invalid or duplicate details")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let name = require_string(payload.name, "name")?;
    let email = require_string(payload.email, "email")?;
    let password = require_string(payload.password, "password")?;
    check_optional_string(&payload.city, "city")?;
    check_optional_string(&payload.country, "country")?;

    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest(
            "data.email should match format 'email'".to_string(),
        ));
    }

    let password_hash =
        auth::hash_password(&password).map_err(|err| ApiError::Internal(err.to_string().into()))?;

    let new_user = NewUser {
        name,
        email,
        password_hash,
        city: payload.city,
        country: payload.country,
    };

    match state.repo.insert_user(new_user).await {
        Ok(user_id) => Ok((StatusCode::CREATED, Json(RegisterResponse { user_id }))),
        Err(crate::repository::RepoError::Conflict) => {
            Err(ApiError::BadRequest("email already in use".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// login
///
/// [Public Route] Validates credentials and mints a fresh session token, replacing
/// any previous one. Wrong email and wrong password are indistinguishable to the
/// caller, avoiding account enumeration.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = require_string(payload.email, "email")?;
    let password = require_string(payload.password, "password")?;

    let invalid = || ApiError::BadRequest("invalid email/password supplied".to_string());

    let user = state.repo.user_by_email(&email).await?.ok_or_else(invalid)?;
    if !auth::verify_password(&password, &user.password_hash) {
        return Err(invalid());
    }

    let token = auth::generate_token();
    state.repo.set_token(user.id, Some(&token)).await?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}

/// logout
///
/// [Authenticated Route] Clears the caller's session token. An unrecognized token
/// is rejected by the extractor with 401.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses((status = 200, description = "Logged out"), (status = 401, description = "No session"))
)]
pub async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.repo.set_token(user.id, None).await?;
    Ok(StatusCode::OK)
}

/// get_user
///
/// [Public Route] Returns a user's public profile. The email is included only when
/// the caller's token belongs to the viewed user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.repo.user_by_id(id).await?.ok_or(ApiError::NotFound)?;
    let is_self = viewer.user().is_some_and(|u| u.id == id);

    Ok(Json(UserProfile {
        name: user.name,
        city: user.city,
        country: user.country,
        email: is_self.then_some(user.email),
    }))
}

/// Shared authorization ladder for self-scoped user endpoints: the target must
/// exist (404 first, so existence is observable without a token), the caller must
/// be authenticated (401), and must be the target user (403).
fn authorize_self(target: Option<User>, caller: &MaybeAuthUser) -> Result<User, ApiError> {
    let target = target.ok_or(ApiError::NotFound)?;
    let caller = caller.user().ok_or(ApiError::Unauthorized)?;
    if caller.id != target.id {
        return Err(ApiError::Forbidden(
            "you may only modify your own account".to_string(),
        ));
    }
    Ok(target)
}

/// update_user
///
/// [Owner Route] Sparse profile patch. Only fields present in the request are
/// persisted; changing the password requires the current password to verify first.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not this user"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, ApiError> {
    let target = authorize_self(state.repo.user_by_id(id).await?, &caller)?;

    let present = [
        &payload.name,
        &payload.email,
        &payload.password,
        &payload.current_password,
        &payload.city,
        &payload.country,
    ];
    if present.iter().all(|field| field.is_none()) {
        return Err(ApiError::BadRequest(
            "you must provide some details to update".to_string(),
        ));
    }
    for (value, field) in [
        (&payload.name, "name"),
        (&payload.email, "email"),
        (&payload.password, "password"),
        (&payload.current_password, "currentPassword"),
        (&payload.city, "city"),
        (&payload.country, "country"),
    ] {
        check_optional_string(value, field)?;
    }

    if payload.password.is_some() && payload.current_password.is_none() {
        return Err(ApiError::BadRequest(
            "please provide current password to change password".to_string(),
        ));
    }
    if let Some(current) = &payload.current_password {
        if !auth::verify_password(current, &target.password_hash) {
            return Err(ApiError::BadRequest("invalid password provided".to_string()));
        }
    }
    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err(ApiError::BadRequest(
                "data.email should match format 'email'".to_string(),
            ));
        }
    }

    let password_hash = match &payload.password {
        Some(password) => Some(
            auth::hash_password(password)
                .map_err(|err| ApiError::Internal(err.to_string().into()))?,
        ),
        None => None,
    };

    let changes = UserChanges {
        name: payload.name,
        email: payload.email,
        password_hash,
        city: payload.city,
        country: payload.country,
    };

    match state.repo.update_user(id, changes).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(crate::repository::RepoError::Conflict) => {
            Err(ApiError::BadRequest("email already in use".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

// --- Petition Handlers ---

/// PetitionListParams
///
/// Accepted query parameters for the petition listing endpoint.
#[derive(Debug, Deserialize, utoipa::IntoParams, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetitionListParams {
    /// Items to skip before returning results (0-based).
    pub start_index: Option<i64>,
    /// Maximum number of items to return.
    pub count: Option<i64>,
    /// Only petitions whose title contains this term.
    pub q: Option<String>,
    /// Only petitions in this category.
    pub category_id: Option<i64>,
    /// Only petitions authored by this user.
    pub author_id: Option<i64>,
    /// One of ALPHABETICAL_ASC, ALPHABETICAL_DESC, SIGNATURES_ASC, SIGNATURES_DESC.
    pub sort_by: Option<String>,
}

/// list_petitions
///
/// [Public Route] Lists petitions with optional filters, then sorts in memory
/// (default SIGNATURES_DESC) and paginates after sorting.
#[utoipa::path(
    get,
    path = "/api/v1/petitions",
    params(PetitionListParams),
    responses(
        (status = 200, description = "Filtered petitions", body = [PetitionOverview]),
        (status = 400, description = "Invalid parameters")
    )
)]
pub async fn list_petitions(
    State(state): State<AppState>,
    Query(params): Query<PetitionListParams>,
) -> Result<Json<Vec<PetitionOverview>>, ApiError> {
    for (value, field) in [
        (params.start_index, "startIndex"),
        (params.count, "count"),
        (params.category_id, "categoryId"),
        (params.author_id, "authorId"),
    ] {
        if value.is_some_and(|v| v < 0) {
            return Err(ApiError::BadRequest(format!("data.{field} should be >= 0")));
        }
    }
    if params.q.as_deref() == Some("") {
        return Err(ApiError::BadRequest("data.q is invalid".to_string()));
    }
    let sort = match &params.sort_by {
        Some(raw) => SortMode::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(
                "data.sortBy should be equal to one of the allowed values".to_string(),
            )
        })?,
        None => SortMode::SignaturesDesc,
    };

    let filter = PetitionFilter {
        category_id: params.category_id,
        author_id: params.author_id,
        q: params.q,
    };

    let mut rows = state.repo.petitions(filter).await?;
    sort_petitions(&mut rows, sort);
    Ok(Json(paginate(rows, params.start_index, params.count)))
}

/// create_petition
///
/// [Authenticated Route] Creates a petition owned by the caller. The closing date,
/// when supplied, must lie strictly after the creation instant.
#[utoipa::path(
    post,
    path = "/api/v1/petitions",
    request_body = CreatePetitionRequest,
    responses(
        (status = 201, description = "Created", body = CreatePetitionResponse),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "No session")
    )
)]
pub async fn create_petition(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePetitionRequest>,
) -> Result<(StatusCode, Json<CreatePetitionResponse>), ApiError> {
    let title = require_string(payload.title, "title")?;
    let description = require_string(payload.description, "description")?;

    let now = Utc::now();
    if let Some(closing) = payload.closing_date {
        if closing <= now {
            return Err(ApiError::BadRequest(
                "Closing date must be in the future".to_string(),
            ));
        }
    }

    let category_id = payload.category_id.ok_or_else(|| {
        ApiError::BadRequest("data should have required property 'categoryId'".to_string())
    })?;
    if category_id < 0 {
        return Err(ApiError::BadRequest(
            "data.categoryId should be >= 0".to_string(),
        ));
    }
    if state.repo.category(category_id).await?.is_none() {
        return Err(ApiError::BadRequest("data.categoryId is invalid".to_string()));
    }

    let petition_id = state
        .repo
        .insert_petition(NewPetition {
            title,
            description,
            category_id,
            author_id: user.id,
            created_date: now,
            closing_date: payload.closing_date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePetitionResponse { petition_id }),
    ))
}

/// get_categories
///
/// [Public Route] Lists the fixed category reference data.
#[utoipa::path(
    get,
    path = "/api/v1/petitions/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.repo.categories().await?))
}

/// get_petition
///
/// [Public Route] Detailed single-petition view, enriched with author and
/// signature-count data.
#[utoipa::path(
    get,
    path = "/api/v1/petitions/{id}",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 200, description = "Found", body = PetitionDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_petition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PetitionDetail>, ApiError> {
    state
        .repo
        .petition_detail(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Authorization ladder for author-scoped petition endpoints. Existence is checked
/// before authentication on purpose: unauthenticated callers still learn whether a
/// petition id exists.
fn authorize_author(
    petition: Option<crate::models::Petition>,
    caller: &MaybeAuthUser,
) -> Result<(crate::models::Petition, User), ApiError> {
    let petition = petition.ok_or(ApiError::NotFound)?;
    let caller = caller.user().ok_or(ApiError::Unauthorized)?.clone();
    if caller.id != petition.author_id {
        return Err(ApiError::Forbidden(
            "only the author may modify this petition".to_string(),
        ));
    }
    Ok((petition, caller))
}

/// update_petition
///
/// [Owner Route] Sparse petition patch. Rejected once the petition has closed;
/// a field whose value equals the stored one is accepted and simply writes nothing
/// new.
#[utoipa::path(
    patch,
    path = "/api/v1/petitions/{id}",
    params(("id" = i64, Path, description = "Petition ID")),
    request_body = UpdatePetitionRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Invalid fields or petition closed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_petition(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePetitionRequest>,
) -> Result<StatusCode, ApiError> {
    let (petition, _) = authorize_author(state.repo.petition(id).await?, &caller)?;

    let now = Utc::now();
    if petition.is_closed(now) {
        return Err(ApiError::BadRequest(
            "Cannot edit a petition that has closed".to_string(),
        ));
    }

    if payload.title.is_none()
        && payload.description.is_none()
        && payload.category_id.is_none()
        && payload.closing_date.is_none()
    {
        return Err(ApiError::BadRequest("no valid fields provided".to_string()));
    }

    check_optional_string(&payload.title, "title")?;
    check_optional_string(&payload.description, "description")?;
    if let Some(closing) = payload.closing_date {
        if closing <= now {
            return Err(ApiError::BadRequest(
                "Closing date must be in the future".to_string(),
            ));
        }
    }
    if let Some(category_id) = payload.category_id {
        if category_id < 0 {
            return Err(ApiError::BadRequest(
                "data.categoryId should be >= 0".to_string(),
            ));
        }
        if state.repo.category(category_id).await?.is_none() {
            return Err(ApiError::BadRequest("data.categoryId is invalid".to_string()));
        }
    }

    state
        .repo
        .update_petition(
            id,
            PetitionChanges {
                title: payload.title,
                description: payload.description,
                category_id: payload.category_id,
                closing_date: payload.closing_date,
            },
        )
        .await?;

    Ok(StatusCode::OK)
}

/// delete_petition
///
/// [Owner Route] Deletes a petition and purges its signatures. Deletion is allowed
/// on closed petitions. The two store operations are sequential, not transactional.
#[utoipa::path(
    delete,
    path = "/api/v1/petitions/{id}",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_petition(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize_author(state.repo.petition(id).await?, &caller)?;

    state.repo.delete_petition(id).await?;
    state.repo.delete_signatures_for(id).await?;

    Ok(StatusCode::OK)
}

// --- Signature Handlers ---

/// list_signatures
///
/// [Public Route] Lists a petition's signatures in signing order.
#[utoipa::path(
    get,
    path = "/api/v1/petitions/{id}/signatures",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 200, description = "Signatures", body = [Signatory]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_signatures(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Signatory>>, ApiError> {
    if state.repo.petition(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.repo.signatures(id).await?))
}

/// sign_petition
///
/// [Authenticated Route] Signs an open petition. A duplicate attempt is caught as
/// a typed uniqueness conflict and reported as 403, never as a second row.
/// Authors may sign their own petitions.
#[utoipa::path(
    post,
    path = "/api/v1/petitions/{id}/signatures",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 201, description = "Signed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Closed or already signed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn sign_petition(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let petition = state.repo.petition(id).await?.ok_or(ApiError::NotFound)?;
    let user = caller.user().ok_or(ApiError::Unauthorized)?;

    let now = Utc::now();
    if petition.is_closed(now) {
        return Err(ApiError::Forbidden(
            "cannot sign a petition that has already closed".to_string(),
        ));
    }

    match state.repo.insert_signature(id, user.id, now).await {
        Ok(()) => Ok(StatusCode::CREATED),
        Err(crate::repository::RepoError::Conflict) => Err(ApiError::Forbidden(
            "cannot sign the same petition twice".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

/// remove_signature
///
/// [Authenticated Route] Removes the caller's signature from an open petition.
/// The author may not remove signatures on their own petition, and removing a
/// signature that was never made is a 403, not a silent success.
#[utoipa::path(
    delete,
    path = "/api/v1/petitions/{id}/signatures",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 200, description = "Removed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Author, closed, or never signed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_signature(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let petition = state.repo.petition(id).await?.ok_or(ApiError::NotFound)?;
    let user = caller.user().ok_or(ApiError::Unauthorized)?;

    if petition.author_id == user.id {
        return Err(ApiError::Forbidden(
            "cannot remove a signature from a petition you created".to_string(),
        ));
    }
    if petition.is_closed(Utc::now()) {
        return Err(ApiError::Forbidden(
            "cannot remove a signature from a petition that has already closed".to_string(),
        ));
    }

    if state.repo.delete_signature(id, user.id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::Forbidden(
            "cannot remove a signature from a petition without first signing it".to_string(),
        ))
    }
}

// --- Photo Handlers ---

/// Serves stored photo bytes with the MIME type recovered from the filename.
fn photo_response(filename: &str, bytes: Vec<u8>) -> Response {
    let mime = ImageType::from_filename(filename)
        .map(|t| t.mime())
        .unwrap_or("application/octet-stream");
    ([(header::CONTENT_TYPE, mime)], bytes).into_response()
}

/// Parses and restricts the upload Content-Type to the three accepted image types.
fn accepted_image_type(headers: &HeaderMap) -> Result<ImageType, ApiError> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(ImageType::from_content_type)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "photo must be image/jpeg, image/png, image/gif type".to_string(),
            )
        })
}

/// Stores new photo bytes for an entity, replacing any previous file.
/// Returns 201 for a first upload, 200 for a replacement.
async fn store_photo(
    state: &AppState,
    previous: Option<&str>,
    filename: &str,
    bytes: &[u8],
) -> Result<StatusCode, ApiError> {
    if let Some(old) = previous {
        state.photos.remove(old).await?;
    }
    state.photos.write(filename, bytes).await?;
    Ok(if previous.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    })
}

/// get_petition_photo
///
/// [Public Route] Serves a petition's hero image.
#[utoipa::path(
    get,
    path = "/api/v1/petitions/{id}/photo",
    params(("id" = i64, Path, description = "Petition ID")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No petition or no photo")
    )
)]
pub async fn get_petition_photo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let petition = state.repo.petition(id).await?.ok_or(ApiError::NotFound)?;
    let filename = petition.photo_filename.ok_or(ApiError::NotFound)?;
    let bytes = state
        .photos
        .read(&filename)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(photo_response(&filename, bytes))
}

/// set_petition_photo
///
/// [Owner Route] Sets or replaces a petition's hero image from raw request bytes.
#[utoipa::path(
    put,
    path = "/api/v1/petitions/{id}/photo",
    params(("id" = i64, Path, description = "Petition ID")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Replaced"),
        (status = 201, description = "Stored"),
        (status = 400, description = "Unsupported content type"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_petition_photo(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<StatusCode, ApiError> {
    let (petition, _) = authorize_author(state.repo.petition(id).await?, &caller)?;
    let image = accepted_image_type(&headers)?;

    let filename = derive_filename("petition", petition.id, image);
    state
        .repo
        .set_petition_photo(petition.id, Some(&filename))
        .await?;
    store_photo(
        &state,
        petition.photo_filename.as_deref(),
        &filename,
        &body,
    )
    .await
}

/// get_user_photo
///
/// [Public Route] Serves a user's profile photo.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/photo",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No user or no photo")
    )
)]
pub async fn get_user_photo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = state.repo.user_by_id(id).await?.ok_or(ApiError::NotFound)?;
    let filename = user.photo_filename.ok_or(ApiError::NotFound)?;
    let bytes = state
        .photos
        .read(&filename)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(photo_response(&filename, bytes))
}

/// set_user_photo
///
/// [Owner Route] Sets or replaces the caller's profile photo.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/photo",
    params(("id" = i64, Path, description = "User ID")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Replaced"),
        (status = 201, description = "Stored"),
        (status = 400, description = "Unsupported content type"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not this user"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_user_photo(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<StatusCode, ApiError> {
    let target = authorize_self(state.repo.user_by_id(id).await?, &caller)?;
    let image = accepted_image_type(&headers)?;

    let filename = derive_filename("user", target.id, image);
    state.repo.set_user_photo(target.id, Some(&filename)).await?;
    store_photo(&state, target.photo_filename.as_deref(), &filename, &body).await
}

/// delete_user_photo
///
/// [Owner Route] Removes the caller's profile photo: clears the stored filename,
/// then deletes the file.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/photo",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Removed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not this user"),
        (status = 404, description = "No user or no photo")
    )
)]
pub async fn delete_user_photo(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let target = authorize_self(state.repo.user_by_id(id).await?, &caller)?;
    let filename = target.photo_filename.ok_or(ApiError::NotFound)?;

    state.repo.set_user_photo(target.id, None).await?;
    state.photos.remove(&filename).await?;

    Ok(StatusCode::OK)
}
