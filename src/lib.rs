pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{DashboardError, Result};
pub use services::dashboard::Dashboard;
pub use services::session::DashboardSession;
