pub mod application;
pub mod identity;
pub mod job;
pub mod message;
pub mod plan;
pub mod portfolio;
pub mod profile;

pub use application::{
    Application, ApplicationStatus, AppliedJob, JobBrief, NewApplication, PartyBrief, ReceivedApplication,
    SubmittedApplication,
};
pub use identity::{Identity, Role, SubscriptionTier};
pub use job::{Job, JobStatus, JobType, NewJob};
pub use message::Message;
pub use plan::{SubscriptionPlan, BASIC_PLAN, PLANS, PREMIUM_PLAN};
pub use portfolio::{NewPortfolioItem, PortfolioItem};
pub use profile::Profile;
