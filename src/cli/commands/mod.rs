pub mod applications;
pub mod auth;
pub mod jobs;
pub mod messages;
pub mod plans;
pub mod portfolio;
pub mod profile;
