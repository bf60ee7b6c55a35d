//! SeaORM Entity for survey_responses table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "survey_responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub survey_assignment_id: Option<i32>,
    pub question_id: Option<i32>,
    pub choice_id: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey_assignments::Entity",
        from = "Column::SurveyAssignmentId",
        to = "super::survey_assignments::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    SurveyAssignment,
    #[sea_orm(
        belongs_to = "super::questions::Entity",
        from = "Column::QuestionId",
        to = "super::questions::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Question,
    #[sea_orm(
        belongs_to = "super::choices::Entity",
        from = "Column::ChoiceId",
        to = "super::choices::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Choice,
}

impl Related<super::survey_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyAssignment.def()
    }
}

impl Related<super::questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::choices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Choice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
