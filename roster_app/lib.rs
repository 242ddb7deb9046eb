pub mod app_bus;
pub mod command_handlers;
pub mod config;
pub mod cqrs;
pub mod jobs;
pub mod queries_handlers;
pub mod repository;
pub mod uow;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
