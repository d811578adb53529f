pub mod availability;
pub mod class;
pub mod people;
pub mod recurring_class;
pub mod schedule;
