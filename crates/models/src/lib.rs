pub mod errors;
pub mod db;
pub mod organization;
pub mod organization_location;
pub mod location;
pub mod role;
pub mod department;
pub mod user;
pub mod user_credentials;
pub mod group;
pub mod group_member;
pub mod activity;
pub mod project;
pub mod task;
pub mod task_assignee;

#[cfg(test)]
mod tests;
