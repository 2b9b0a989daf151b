pub mod dashboard;
pub mod file_loader;
pub mod session;
