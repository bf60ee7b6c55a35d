//! SeaORM Entity for permission_grants table
//!
//! One row grants a permission on a single object to either a user or a group.
//! The permission kind implies the object's table:
//! - ViewAssignment: survey_assignments.id
//! - ViewResults: surveys.id

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Permission {
    /// Answer and view one survey assignment.
    #[sea_orm(string_value = "view_assignment")]
    ViewAssignment,
    /// View the aggregated results of one survey.
    #[sea_orm(string_value = "view_results")]
    ViewResults,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "permission_grants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Set for user grants. Mutually exclusive with group_id.
    pub user_id: Option<i32>,
    /// Set for group grants. Mutually exclusive with user_id.
    pub group_id: Option<i32>,
    pub permission: Permission,
    pub object_id: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Group,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
