use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/files", file_routes())
}

fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::file::upload_file,
            handlers::file::list_files
        ))
        .routes(routes!(handlers::file::search_files))
        .routes(routes!(handlers::file::file_stats))
        .routes(routes!(handlers::file::get_file))
        .routes(routes!(handlers::file::download_file))
}
