use internhub_service::InternHub;

/// Shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub hub: InternHub,
}

impl AppState {
    pub fn new(hub: InternHub) -> Self {
        Self { hub }
    }
}
