use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::{
    Category, NewPetition, NewUser, Petition, PetitionChanges, PetitionDetail, PetitionFilter,
    PetitionOverview, Signatory, User, UserChanges,
};

/// RepoError
///
/// Typed store failure. `Conflict` is raised on uniqueness violations (duplicate
/// email, duplicate signature) so handlers can map them to their endpoint-specific
/// status without ever inspecting store error codes.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("uniqueness constraint violated")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Translates an insert/update failure, surfacing unique-constraint violations as
/// the typed `Conflict` variant.
fn map_write_err(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => RepoError::Conflict,
        _ => RepoError::Database(err),
    }
}

/// Repository Trait
///
/// Abstract contract for all persistence operations, shared as `Arc<dyn Repository>`
/// across handlers. The concrete backend is Postgres; the in-memory implementation
/// below backs the integration tests.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Sessions ---
    async fn insert_user(&self, user: NewUser) -> Result<i64, RepoError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Resolves a bearer token to a user. `None` means unauthenticated.
    async fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError>;
    /// Stores a freshly minted token, or `None` on logout.
    async fn set_token(&self, user_id: i64, token: Option<&str>) -> Result<(), RepoError>;
    /// Sparse patch: only `Some` fields are written.
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), RepoError>;
    async fn set_user_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError>;

    // --- Categories ---
    async fn categories(&self) -> Result<Vec<Category>, RepoError>;
    async fn category(&self, id: i64) -> Result<Option<Category>, RepoError>;

    // --- Petitions ---
    /// Filtered listing joined with author name, category name, and signature count.
    /// Sorting and pagination happen in the handler, not here.
    async fn petitions(&self, filter: PetitionFilter) -> Result<Vec<PetitionOverview>, RepoError>;
    async fn petition(&self, id: i64) -> Result<Option<Petition>, RepoError>;
    async fn petition_detail(&self, id: i64) -> Result<Option<PetitionDetail>, RepoError>;
    async fn insert_petition(&self, petition: NewPetition) -> Result<i64, RepoError>;
    async fn update_petition(&self, id: i64, changes: PetitionChanges) -> Result<(), RepoError>;
    async fn delete_petition(&self, id: i64) -> Result<(), RepoError>;
    async fn set_petition_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError>;

    // --- Signatures ---
    async fn signatures(&self, petition_id: i64) -> Result<Vec<Signatory>, RepoError>;
    async fn insert_signature(
        &self,
        petition_id: i64,
        signatory_id: i64,
        signed_date: DateTime<Utc>,
    ) -> Result<(), RepoError>;
    /// Returns false when the caller had no signature to remove.
    async fn delete_signature(&self, petition_id: i64, signatory_id: i64)
    -> Result<bool, RepoError>;
    /// Cascade step after a petition delete.
    async fn delete_signatures_for(&self, petition_id: i64) -> Result<(), RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by Postgres.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, city, country, photo_filename, auth_token";

const PETITION_COLUMNS: &str =
    "id, title, description, category_id, author_id, created_date, closing_date, photo_filename";

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert_user(&self, user: NewUser) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (name, email, password_hash, city, country) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.city)
        .bind(&user.country)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE auth_token = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_token(&self, user_id: i64, token: Option<&str>) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET auth_token = $1 WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Sparse patch via COALESCE: a NULL bind leaves the stored value untouched.
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 city = COALESCE($5, city), \
                 country = COALESCE($6, country) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(&changes.city)
        .bind(&changes.country)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn set_user_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET photo_filename = $1 WHERE id = $2")
            .bind(filename)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn categories(&self) -> Result<Vec<Category>, RepoError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn category(&self, id: i64) -> Result<Option<Category>, RepoError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Composes the listing query with optional equality/substring filters, using
    /// QueryBuilder for safe parameterization.
    async fn petitions(&self, filter: PetitionFilter) -> Result<Vec<PetitionOverview>, RepoError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT p.id AS petition_id, p.title, c.name AS category, \
                    u.name AS author_name, COUNT(s.signatory_id) AS signature_count \
             FROM petitions p \
             JOIN users u ON u.id = p.author_id \
             JOIN categories c ON c.id = p.category_id \
             LEFT JOIN signatures s ON s.petition_id = p.id \
             WHERE 1 = 1",
        );

        if let Some(category_id) = filter.category_id {
            builder.push(" AND p.category_id = ");
            builder.push_bind(category_id);
        }
        if let Some(author_id) = filter.author_id {
            builder.push(" AND p.author_id = ");
            builder.push_bind(author_id);
        }
        if let Some(q) = filter.q {
            builder.push(" AND p.title ILIKE ");
            builder.push_bind(format!("%{q}%"));
        }

        builder.push(" GROUP BY p.id, p.title, c.name, u.name");

        Ok(builder
            .build_query_as::<PetitionOverview>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn petition(&self, id: i64) -> Result<Option<Petition>, RepoError> {
        let query = format!("SELECT {PETITION_COLUMNS} FROM petitions WHERE id = $1");
        Ok(sqlx::query_as::<_, Petition>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn petition_detail(&self, id: i64) -> Result<Option<PetitionDetail>, RepoError> {
        Ok(sqlx::query_as::<_, PetitionDetail>(
            "SELECT p.id AS petition_id, p.title, p.description, p.author_id, \
                    u.name AS author_name, u.city AS author_city, u.country AS author_country, \
                    COUNT(s.signatory_id) AS signature_count, c.name AS category, \
                    p.created_date, p.closing_date \
             FROM petitions p \
             JOIN users u ON u.id = p.author_id \
             JOIN categories c ON c.id = p.category_id \
             LEFT JOIN signatures s ON s.petition_id = p.id \
             WHERE p.id = $1 \
             GROUP BY p.id, p.title, p.description, p.author_id, u.name, u.city, u.country, \
                      c.name, p.created_date, p.closing_date",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_petition(&self, petition: NewPetition) -> Result<i64, RepoError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "INSERT INTO petitions (title, description, category_id, author_id, created_date, closing_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&petition.title)
        .bind(&petition.description)
        .bind(petition.category_id)
        .bind(petition.author_id)
        .bind(petition.created_date)
        .bind(petition.closing_date)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_petition(&self, id: i64, changes: PetitionChanges) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE petitions SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 category_id = COALESCE($4, category_id), \
                 closing_date = COALESCE($5, closing_date) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.category_id)
        .bind(changes.closing_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_petition(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM petitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_petition_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError> {
        sqlx::query("UPDATE petitions SET photo_filename = $1 WHERE id = $2")
            .bind(filename)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn signatures(&self, petition_id: i64) -> Result<Vec<Signatory>, RepoError> {
        Ok(sqlx::query_as::<_, Signatory>(
            "SELECT s.signatory_id, u.name, u.city, u.country, s.signed_date \
             FROM signatures s \
             JOIN users u ON u.id = s.signatory_id \
             WHERE s.petition_id = $1 \
             ORDER BY s.signed_date ASC",
        )
        .bind(petition_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_signature(
        &self,
        petition_id: i64,
        signatory_id: i64,
        signed_date: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO signatures (petition_id, signatory_id, signed_date) VALUES ($1, $2, $3)",
        )
        .bind(petition_id)
        .bind(signatory_id)
        .bind(signed_date)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn delete_signature(
        &self,
        petition_id: i64,
        signatory_id: i64,
    ) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM signatures WHERE petition_id = $1 AND signatory_id = $2")
                .bind(petition_id)
                .bind(signatory_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_signatures_for(&self, petition_id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM signatures WHERE petition_id = $1")
            .bind(petition_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// --- In-Memory Implementation (For Tests) ---

#[derive(Debug, Clone)]
struct SignatureRecord {
    petition_id: i64,
    signatory_id: i64,
    signed_date: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    petitions: Vec<Petition>,
    categories: Vec<Category>,
    signatures: Vec<SignatureRecord>,
    next_user_id: i64,
    next_petition_id: i64,
}

/// MemoryRepository
///
/// An in-memory implementation of `Repository` used by the integration tests, so
/// the full HTTP surface can be exercised without a running Postgres. Uniqueness
/// rules (email, one signature per user per petition) are enforced the same way
/// the schema constraints enforce them.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    /// Creates an empty repository pre-seeded with the reference category set.
    pub fn new() -> Self {
        let categories = [
            "Animals",
            "Environment",
            "Health",
            "Education",
            "Human Rights",
        ]
        .iter()
        .enumerate()
        .map(|(idx, name)| Category {
            id: idx as i64 + 1,
            name: name.to_string(),
        })
        .collect();

        Self {
            state: Mutex::new(MemoryState {
                categories,
                next_user_id: 1,
                next_petition_id: 1,
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_user(&self, user: NewUser) -> Result<i64, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict);
        }
        let id = state.next_user_id;
        state.next_user_id += 1;
        state.users.push(User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            city: user.city,
            country: user.country,
            photo_filename: None,
            auth_token: None,
        });
        Ok(id)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.auth_token.as_deref() == Some(token))
            .cloned())
    }

    async fn set_token(&self, user_id: i64, token: Option<&str>) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.auth_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(email) = &changes.email {
            if state.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict);
            }
        }
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            if let Some(city) = changes.city {
                user.city = Some(city);
            }
            if let Some(country) = changes.country {
                user.country = Some(country);
            }
        }
        Ok(())
    }

    async fn set_user_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.photo_filename = filename.map(str::to_string);
        }
        Ok(())
    }

    async fn categories(&self) -> Result<Vec<Category>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.categories.clone())
    }

    async fn category(&self, id: i64) -> Result<Option<Category>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn petitions(&self, filter: PetitionFilter) -> Result<Vec<PetitionOverview>, RepoError> {
        let state = self.state.lock().unwrap();
        let needle = filter.q.map(|q| q.to_lowercase());
        let rows = state
            .petitions
            .iter()
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == c))
            .filter(|p| filter.author_id.is_none_or(|a| p.author_id == a))
            .filter(|p| {
                needle
                    .as_ref()
                    .is_none_or(|q| p.title.to_lowercase().contains(q))
            })
            .map(|p| PetitionOverview {
                petition_id: p.id,
                title: p.title.clone(),
                category: state
                    .categories
                    .iter()
                    .find(|c| c.id == p.category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                author_name: state
                    .users
                    .iter()
                    .find(|u| u.id == p.author_id)
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
                signature_count: state
                    .signatures
                    .iter()
                    .filter(|s| s.petition_id == p.id)
                    .count() as i64,
            })
            .collect();
        Ok(rows)
    }

    async fn petition(&self, id: i64) -> Result<Option<Petition>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.petitions.iter().find(|p| p.id == id).cloned())
    }

    async fn petition_detail(&self, id: i64) -> Result<Option<PetitionDetail>, RepoError> {
        let state = self.state.lock().unwrap();
        let Some(petition) = state.petitions.iter().find(|p| p.id == id) else {
            return Ok(None);
        };
        let author = state.users.iter().find(|u| u.id == petition.author_id);
        Ok(Some(PetitionDetail {
            petition_id: petition.id,
            title: petition.title.clone(),
            description: petition.description.clone(),
            author_id: petition.author_id,
            author_name: author.map(|u| u.name.clone()).unwrap_or_default(),
            author_city: author.and_then(|u| u.city.clone()),
            author_country: author.and_then(|u| u.country.clone()),
            signature_count: state
                .signatures
                .iter()
                .filter(|s| s.petition_id == id)
                .count() as i64,
            category: state
                .categories
                .iter()
                .find(|c| c.id == petition.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            created_date: petition.created_date,
            closing_date: petition.closing_date,
        }))
    }

    async fn insert_petition(&self, petition: NewPetition) -> Result<i64, RepoError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_petition_id;
        state.next_petition_id += 1;
        state.petitions.push(Petition {
            id,
            title: petition.title,
            description: petition.description,
            category_id: petition.category_id,
            author_id: petition.author_id,
            created_date: petition.created_date,
            closing_date: petition.closing_date,
            photo_filename: None,
        });
        Ok(id)
    }

    async fn update_petition(&self, id: i64, changes: PetitionChanges) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(petition) = state.petitions.iter_mut().find(|p| p.id == id) {
            if let Some(title) = changes.title {
                petition.title = title;
            }
            if let Some(description) = changes.description {
                petition.description = description;
            }
            if let Some(category_id) = changes.category_id {
                petition.category_id = category_id;
            }
            if let Some(closing_date) = changes.closing_date {
                petition.closing_date = Some(closing_date);
            }
        }
        Ok(())
    }

    async fn delete_petition(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.petitions.retain(|p| p.id != id);
        Ok(())
    }

    async fn set_petition_photo(&self, id: i64, filename: Option<&str>) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(petition) = state.petitions.iter_mut().find(|p| p.id == id) {
            petition.photo_filename = filename.map(str::to_string);
        }
        Ok(())
    }

    async fn signatures(&self, petition_id: i64) -> Result<Vec<Signatory>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Signatory> = state
            .signatures
            .iter()
            .filter(|s| s.petition_id == petition_id)
            .map(|s| {
                let signer = state.users.iter().find(|u| u.id == s.signatory_id);
                Signatory {
                    signatory_id: s.signatory_id,
                    name: signer.map(|u| u.name.clone()).unwrap_or_default(),
                    city: signer.and_then(|u| u.city.clone()),
                    country: signer.and_then(|u| u.country.clone()),
                    signed_date: s.signed_date,
                }
            })
            .collect();
        rows.sort_by_key(|s| s.signed_date);
        Ok(rows)
    }

    async fn insert_signature(
        &self,
        petition_id: i64,
        signatory_id: i64,
        signed_date: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if state
            .signatures
            .iter()
            .any(|s| s.petition_id == petition_id && s.signatory_id == signatory_id)
        {
            return Err(RepoError::Conflict);
        }
        state.signatures.push(SignatureRecord {
            petition_id,
            signatory_id,
            signed_date,
        });
        Ok(())
    }

    async fn delete_signature(
        &self,
        petition_id: i64,
        signatory_id: i64,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.signatures.len();
        state
            .signatures
            .retain(|s| !(s.petition_id == petition_id && s.signatory_id == signatory_id));
        Ok(state.signatures.len() < before)
    }

    async fn delete_signatures_for(&self, petition_id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.signatures.retain(|s| s.petition_id != petition_id);
        Ok(())
    }
}
