use crate::orm::users;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};

/// The authenticated user of one request.
///
/// Built by the client context middleware and handed explicitly to every
/// workflow that acts on behalf of a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<users::Model> for Principal {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl Principal {
    /// Returns the principal for an active (confirmed) account.
    pub async fn get_by_id<C>(db: &C, id: i32) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(users::Entity::find_by_id(id)
            .filter(users::Column::IsActive.eq(true))
            .one(db)
            .await?
            .map(Self::from))
    }
}

/// Minimal user info for pickers and listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.username,
        }
    }
}

/// All users, ordered by name.
pub async fn list_users<C>(db: &C) -> Result<Vec<UserSummary>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(users::Entity::find()
        .order_by_asc(users::Column::Username)
        .all(db)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect())
}

/// Looks up summaries for the given ids, preserving id order.
pub async fn get_summaries<C>(db: &C, ids: &[i32]) -> Result<Vec<UserSummary>, DbErr>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids.to_vec()))
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect())
}

/// Returns the subset of `ids` that name no existing user.
pub async fn unknown_user_ids<C>(db: &C, ids: &[i32]) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let known: Vec<i32> = get_summaries(db, ids)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();

    Ok(ids
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect())
}

pub async fn find_by_username<C>(db: &C, name: &str) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    users::Entity::find()
        .filter(users::Column::Username.eq(name))
        .one(db)
        .await
}

pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await
}
