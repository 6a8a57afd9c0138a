pub mod assessment;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod prompt;
pub mod render;
pub mod service;
pub mod session;
pub mod transport;

pub use crate::config::Config;
pub use crate::error::{PainCareError, Result};
pub use crate::handlers::{AppState, router};
pub use crate::service::ChatService;
