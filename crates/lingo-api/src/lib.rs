pub mod auth;
pub mod chat;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod files;
pub mod gateway;
pub mod intent;
pub mod middleware;
pub mod notifications;
pub mod records;
pub mod routes;
pub mod state;
pub mod themes;
pub mod translate;

pub use dispatch::MessageDispatcher;
pub use routes::router;
pub use state::{AppState, AppStateInner};
