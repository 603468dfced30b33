pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::advice::handlers as advice;
use crate::auth::handlers as auth;
use crate::auth::middleware::require_auth;
use crate::chat::handlers as chat;
use crate::state::AppState;
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    // Routes that require a bearer token
    let protected = Router::new()
        .route("/me", get(auth::handle_me))
        .route("/users", post(auth::handle_create_user))
        // Fill pipeline
        .route("/run", post(advice::handle_run))
        // Categories / subcategories / advisory texts
        .route(
            "/categories",
            get(templates::handle_list_categories).post(templates::handle_create_category),
        )
        .route(
            "/categories/:id",
            get(templates::handle_get_category)
                .put(templates::handle_update_category)
                .delete(templates::handle_delete_category),
        )
        .route(
            "/categories/:id/subcategories",
            get(templates::handle_list_sub_categories_by_category),
        )
        .route("/subcategories", get(templates::handle_list_sub_categories))
        .route("/subcategories/:id", get(templates::handle_get_sub_category))
        .route(
            "/advisorytexts",
            get(templates::handle_list_advisory_texts).post(templates::handle_create_advisory_text),
        )
        .route(
            "/advisorytexts/:id",
            get(templates::handle_get_advisory_text)
                .put(templates::handle_update_advisory_text)
                .delete(templates::handle_delete_advisory_text),
        )
        .route(
            "/advisorytexts/subcategory/:id",
            get(templates::handle_get_advisory_text_by_sub_category),
        )
        // Conversations
        .route(
            "/conversations",
            get(chat::handle_list_conversations)
                .post(chat::handle_create_conversation)
                .delete(chat::handle_delete_all_conversations),
        )
        .route(
            "/conversations/:id",
            axum::routing::delete(chat::handle_delete_conversation),
        )
        .route("/conversations/:id/messages", get(chat::handle_list_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Public routes
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/token", post(auth::handle_login))
        .route("/verify-token/:token", get(auth::handle_verify_token));

    public.merge(protected).with_state(state)
}
