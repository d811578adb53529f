pub mod availability;
pub mod class;
pub mod people;
pub mod schedule;
