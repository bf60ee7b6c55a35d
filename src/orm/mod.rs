pub mod choices;
pub mod groups;
pub mod permission_grants;
pub mod questions;
pub mod sessions;
pub mod survey_assignments;
pub mod survey_responses;
pub mod surveys;
pub mod user_groups;
pub mod users;
