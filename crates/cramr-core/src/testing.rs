use std::sync::Arc;

use cramr_db::Database;
use cramr_types::models::UserContext;

use crate::backend::{Backend, SqliteBackend};

/// In-memory backend with the given `(user_id, username)` users signed up.
pub async fn backend_with_users(users: &[(&str, &str)]) -> Arc<dyn Backend> {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let backend = SqliteBackend::new(db);
    for (id, name) in users {
        backend.signup(id, name, "", "").await.unwrap();
    }
    Arc::new(backend)
}

pub fn ctx(user_id: &str, username: &str) -> UserContext {
    UserContext::new(user_id, username)
}
