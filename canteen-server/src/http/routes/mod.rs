//! Route handlers organized by resource

pub mod admin;
pub mod auth;
pub mod canteens;
pub mod cart;
pub mod exams;
pub mod feedback;
pub mod health;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod users;

mod upload;
