mod availability_test;
mod classes_test;
mod health_test;
mod middleware_test;
mod recurring_test;
mod schedule_test;
mod test_utils;
