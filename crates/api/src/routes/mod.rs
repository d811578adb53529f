pub mod availability;
pub mod classes;
pub mod health;
pub mod recurring;
pub mod schedule;
