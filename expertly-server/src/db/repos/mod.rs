//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Borrows the shared pool (`XRepo::new(&pool)`)
//! - Embeds related rows as JSON in the same query (no N+1)
//! - Maps constraint violations to conflicts (no check-then-insert)
//! - Uses transactions for multi-step operations

pub mod categories;
pub mod customers;
pub mod experts;
pub mod otp;
pub mod sessions;
pub mod specializations;
pub mod testimonials;
pub mod users;

pub use super::error::DbError;
pub use categories::{Category, CategoryQuery, CategoryRepo, CategoryWithCount, CategoryWithRelations};
pub use customers::{Customer, CustomerRepo, CustomerWithUser};
pub use experts::{Expert, ExpertRepo, ExpertStatistics, ExpertWithRelations, SpecializationSummary};
pub use otp::{AttemptClaim, OtpRecord, OtpRepo};
pub use sessions::{Session, SessionClient, SessionRepo};
pub use specializations::{
    CategoryWithParent, ExpertBrief, Specialization, SpecializationDetail, SpecializationQuery,
    SpecializationRepo,
};
pub use testimonials::{Testimonial, TestimonialRepo};
pub use users::{User, UserRepo, UserSummary};
