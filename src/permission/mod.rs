//! Object-level permission registry.
//!
//! Grants are (subject, permission, object) triples where the subject is a
//! user or a group. Grants are additive; nothing in the application revokes
//! them. Granting twice is a no-op, as is adding a member twice.
//!
//! Access checks hand out capability values (see [`capability`]) which the
//! survey workflows require as arguments, so a workflow cannot run without
//! its check having passed.

pub mod capability;

pub use crate::orm::permission_grants::Permission;
pub use capability::{
    require_assignment_access, require_results_access, require_survey_owner, AssignmentAccess,
    ResultsAccess, SurveyOwnership,
};

use crate::orm::{groups, permission_grants, user_groups};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveEnum, Condition, ConnectionTrait, DbErr};

/// Name of the group whose members may view a survey's results.
pub fn results_group_name(survey_id: i32) -> String {
    format!("survey-{}-results", survey_id)
}

/// Grant a permission on one object to a user. Returns false if it was already granted.
pub async fn grant_user<C>(
    db: &C,
    user_id: i32,
    permission: Permission,
    object_id: i32,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let existing = permission_grants::Entity::find()
        .filter(permission_grants::Column::UserId.eq(user_id))
        .filter(permission_grants::Column::Permission.eq(permission.to_value()))
        .filter(permission_grants::Column::ObjectId.eq(object_id))
        .count(db)
        .await?;

    if existing > 0 {
        return Ok(false);
    }

    permission_grants::ActiveModel {
        user_id: Set(Some(user_id)),
        group_id: Set(None),
        permission: Set(permission),
        object_id: Set(object_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::debug!(
        "Granted {:?} on {} to user {}",
        permission,
        object_id,
        user_id
    );
    Ok(true)
}

/// Grant a permission on one object to a group. Returns false if it was already granted.
pub async fn grant_group<C>(
    db: &C,
    group_id: i32,
    permission: Permission,
    object_id: i32,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let existing = permission_grants::Entity::find()
        .filter(permission_grants::Column::GroupId.eq(group_id))
        .filter(permission_grants::Column::Permission.eq(permission.to_value()))
        .filter(permission_grants::Column::ObjectId.eq(object_id))
        .count(db)
        .await?;

    if existing > 0 {
        return Ok(false);
    }

    permission_grants::ActiveModel {
        user_id: Set(None),
        group_id: Set(Some(group_id)),
        permission: Set(permission),
        object_id: Set(object_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::debug!(
        "Granted {:?} on {} to group {}",
        permission,
        object_id,
        group_id
    );
    Ok(true)
}

pub async fn find_group<C>(db: &C, name: &str) -> Result<Option<groups::Model>, DbErr>
where
    C: ConnectionTrait,
{
    groups::Entity::find()
        .filter(groups::Column::Name.eq(name))
        .one(db)
        .await
}

/// Find a group by name, creating it if missing.
pub async fn ensure_group<C>(db: &C, name: &str) -> Result<groups::Model, DbErr>
where
    C: ConnectionTrait,
{
    if let Some(group) = find_group(db, name).await? {
        return Ok(group);
    }

    groups::ActiveModel {
        name: Set(name.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Add a user to a group. Returns false if they were already a member.
pub async fn add_member<C>(db: &C, group_id: i32, user_id: i32) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let existing = user_groups::Entity::find()
        .filter(user_groups::Column::GroupId.eq(group_id))
        .filter(user_groups::Column::UserId.eq(user_id))
        .count(db)
        .await?;

    if existing > 0 {
        return Ok(false);
    }

    user_groups::ActiveModel {
        user_id: Set(Some(user_id)),
        group_id: Set(Some(group_id)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(true)
}

pub async fn group_ids_for_user<C>(db: &C, user_id: i32) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(user_groups::Entity::find()
        .filter(user_groups::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|m| m.group_id)
        .collect())
}

pub async fn group_member_ids<C>(db: &C, group_id: i32) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<i32> = user_groups::Entity::find()
        .filter(user_groups::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|m| m.user_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Condition matching grants held by the user directly or through any of their groups.
async fn subject_condition<C>(db: &C, user_id: i32) -> Result<Condition, DbErr>
where
    C: ConnectionTrait,
{
    let group_ids = group_ids_for_user(db, user_id).await?;
    let mut cond = Condition::any().add(permission_grants::Column::UserId.eq(user_id));
    if !group_ids.is_empty() {
        cond = cond.add(permission_grants::Column::GroupId.is_in(group_ids));
    }
    Ok(cond)
}

/// Does the user hold the permission on the object, directly or via a group?
pub async fn has_permission<C>(
    db: &C,
    user_id: i32,
    permission: Permission,
    object_id: i32,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let count = permission_grants::Entity::find()
        .filter(permission_grants::Column::Permission.eq(permission.to_value()))
        .filter(permission_grants::Column::ObjectId.eq(object_id))
        .filter(subject_condition(db, user_id).await?)
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Every object id the user can reach with the permission, ascending.
pub async fn objects_for_user<C>(
    db: &C,
    user_id: i32,
    permission: Permission,
) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<i32> = permission_grants::Entity::find()
        .filter(permission_grants::Column::Permission.eq(permission.to_value()))
        .filter(subject_condition(db, user_id).await?)
        .all(db)
        .await?
        .into_iter()
        .map(|g| g.object_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Every user holding the permission on the object, directly or via a group, ascending.
pub async fn users_with_permission<C>(
    db: &C,
    permission: Permission,
    object_id: i32,
) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let grants = permission_grants::Entity::find()
        .filter(permission_grants::Column::Permission.eq(permission.to_value()))
        .filter(permission_grants::Column::ObjectId.eq(object_id))
        .all(db)
        .await?;

    let mut ids = Vec::new();
    for grant in grants {
        if let Some(user_id) = grant.user_id {
            ids.push(user_id);
        }
        if let Some(group_id) = grant.group_id {
            ids.extend(group_member_ids(db, group_id).await?);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}
