use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tower_lsp::Client;

mod handlers;
mod state;
mod utils;

pub use state::{GlslBackend, Session};
pub use utils::to_completion_item;

pub const SERVER_NAME: &str = "glsl-language-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

impl GlslBackend {
    /// Creates a backend for `client` over an already constructed session.
    pub fn new(client: Client, session: Session) -> Self {
        Self {
            client,
            session,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the client has sent `shutdown`.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}
