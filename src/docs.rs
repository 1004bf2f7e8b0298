use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    handlers::{accounts, categories, todos},
    models::{Category, Priority, Todo, User},
    serializers::{CategoryPayload, RegisterPayload, TodoPayload, TokenRequest, TokenResponse},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        categories::update_category,
        categories::partial_update_category,
        categories::delete_category,
        todos::list_todos,
        todos::create_todo,
        todos::get_todo,
        todos::update_todo,
        todos::partial_update_todo,
        todos::delete_todo,
        accounts::register,
        accounts::obtain_token,
        accounts::me,
        accounts::delete_me,
    ),
    components(
        schemas(
            Category,
            CategoryPayload,
            Priority,
            Todo,
            TodoPayload,
            User,
            RegisterPayload,
            TokenRequest,
            TokenResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "category", description = "Todo categories of the signed-in user"),
        (name = "todo", description = "Todo items of the signed-in user"),
        (name = "account", description = "Registration and access tokens"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
