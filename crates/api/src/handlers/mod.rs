pub mod availability;
pub mod classes;
pub mod recurring;
pub mod schedule;
