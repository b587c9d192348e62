//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod account;
pub mod university_id;
pub mod catalog;
pub mod ordering;
pub mod status;
pub mod priority;
pub mod pagination;

pub use validation::ValidationError;
pub use account::{Email, Password, PersonName, Phone};
pub use university_id::UniversityId;
pub use catalog::{CanteenName, Category, ItemName, Price};
pub use ordering::{Quantity, Rating};
pub use status::{OrderStatus, PaymentStatus, Role};
pub use priority::{check_eligibility, ExamRange, Ineligible};
pub use pagination::{Pagination, Paginated, PaginationParams};
