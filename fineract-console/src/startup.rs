use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    app, asset_owners, auth, batch, clients, collection_sheet, datatables, delinquency, jobs, loans,
    maker_checker, metrics, provisioning, reports, roles, tellers, users,
};
use crate::services::metrics::http_metrics_middleware;
use crate::AppState;

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(server.session_hours)));

    let login = get(auth::login_page).merge(post(auth::login_handler).layer(from_fn_with_state(
        state.login_limiter.clone(),
        ip_rate_limit_middleware,
    )));

    Router::new()
        .route("/", get(app::index))
        .route("/health", get(app::health_check))
        .route("/metrics", get(metrics::metrics))
        .route("/login", login)
        .route("/logout", post(auth::logout_handler))
        .route("/dashboard", get(app::dashboard))
        .merge(client_routes())
        .merge(loan_routes())
        .merge(teller_routes())
        .merge(admin_routes())
        .merge(report_routes())
        .merge(portfolio_routes())
        .route_layer(from_fn(http_metrics_middleware))
        .nest_service("/static", ServeDir::new("fineract-console/static"))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(clients::list).post(clients::create))
        .route("/clients/search", post(clients::search))
        .route("/clients/new", get(clients::new))
        .route("/clients/:id", get(clients::show).post(clients::update))
        .route("/clients/:id/edit", get(clients::edit))
        .route("/clients/:id/command", post(clients::command))
        .route("/clients/:id/delete", get(clients::confirm_delete).post(clients::delete))
        .route("/collection-sheet", get(collection_sheet::show))
        .route("/collection-sheet/generate", post(collection_sheet::generate))
        .route("/collection-sheet/save", post(collection_sheet::save))
}

fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(loans::list))
        .route("/loans/search", post(loans::search))
        .route("/loans/:id", get(loans::show))
        .route("/loans/:id/command", post(loans::command))
        .route("/loans/:id/repayment", post(loans::repayment))
        .route("/asset-owners", get(asset_owners::search).post(asset_owners::search_submit))
        .route("/asset-owners/loans/:id", get(asset_owners::loan))
        .route("/asset-owners/loans/:id/sale", post(asset_owners::sell))
        .route("/asset-owners/loans/:id/buyback", post(asset_owners::buyback))
        .route(
            "/asset-owners/loans/:id/transfers/:transfer_id/cancel",
            post(asset_owners::cancel),
        )
}

fn teller_routes() -> Router<AppState> {
    Router::new()
        .route("/tellers", get(tellers::list).post(tellers::create))
        .route("/tellers/new", get(tellers::new))
        .route("/tellers/:id", get(tellers::show).post(tellers::update))
        .route("/tellers/:id/edit", get(tellers::edit))
        .route("/tellers/:id/delete", get(tellers::confirm_delete).post(tellers::delete))
        .route("/tellers/:id/cashiers", post(tellers::create_cashier))
        .route(
            "/tellers/:id/cashiers/:cashier_id/delete",
            get(tellers::confirm_delete_cashier).post(tellers::delete_cashier),
        )
        .route(
            "/tellers/:id/cashiers/:cashier_id/allocate",
            get(tellers::allocate_form).post(tellers::allocate),
        )
        .route(
            "/tellers/:id/cashiers/:cashier_id/settle",
            get(tellers::settle_form).post(tellers::settle),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/new", get(users::new))
        .route("/users/:id", get(users::show).post(users::update))
        .route("/users/:id/edit", get(users::edit))
        .route("/users/:id/delete", get(users::confirm_delete).post(users::delete))
        .route("/roles", get(roles::list).post(roles::create))
        .route("/roles/new", get(roles::new))
        .route("/roles/:id", post(roles::update))
        .route("/roles/:id/edit", get(roles::edit))
        .route("/roles/:id/delete", get(roles::confirm_delete).post(roles::delete))
        .route("/roles/:id/enable", post(roles::enable))
        .route("/roles/:id/disable", post(roles::disable))
        .route(
            "/roles/:id/permissions",
            get(roles::permissions).post(roles::update_permissions),
        )
        .route("/maker-checker", get(maker_checker::show).post(maker_checker::update))
        .route("/batch", get(batch::show).post(batch::submit))
        .route("/datatables", get(datatables::list).post(datatables::create))
        .route("/datatables/new", get(datatables::new))
        .route("/datatables/entries", get(datatables::entries))
        .route("/datatables/:name", get(datatables::show))
        .route(
            "/datatables/:name/delete",
            get(datatables::confirm_delete).post(datatables::delete),
        )
        .route("/datatables/:name/entries/:entity_id", post(datatables::add_entry))
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(reports::list).post(reports::create))
        .route("/reports/new", get(reports::new))
        .route("/reports/:id", post(reports::update))
        .route("/reports/:id/edit", get(reports::edit))
        .route("/reports/:id/delete", get(reports::confirm_delete).post(reports::delete))
        .route("/reports/:id/run", get(reports::run_form).post(reports::run))
        .route("/reports/:id/csv", get(reports::csv))
        .route("/jobs", get(jobs::list))
        .route("/jobs/:id", post(jobs::update))
        .route("/jobs/:id/edit", get(jobs::edit))
        .route("/jobs/:id/run", post(jobs::run))
        .route("/jobs/:id/history", get(jobs::history))
        .route("/scheduler/start", post(jobs::start_scheduler))
        .route("/scheduler/stop", post(jobs::stop_scheduler))
}

fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/provisioning", get(provisioning::list).post(provisioning::create))
        .route("/provisioning/new", get(provisioning::new))
        .route("/provisioning/:id", get(provisioning::show).post(provisioning::update))
        .route("/provisioning/:id/edit", get(provisioning::edit))
        .route(
            "/provisioning/:id/delete",
            get(provisioning::confirm_delete).post(provisioning::delete),
        )
        .route("/delinquency", get(delinquency::list))
        .route("/delinquency/ranges", post(delinquency::create_range))
        .route("/delinquency/ranges/new", get(delinquency::new_range))
        .route("/delinquency/ranges/:id", post(delinquency::update_range))
        .route("/delinquency/ranges/:id/edit", get(delinquency::edit_range))
        .route(
            "/delinquency/ranges/:id/delete",
            get(delinquency::confirm_delete_range).post(delinquency::delete_range),
        )
        .route("/delinquency/buckets", post(delinquency::create_bucket))
        .route("/delinquency/buckets/new", get(delinquency::new_bucket))
        .route("/delinquency/buckets/:id", post(delinquency::update_bucket))
        .route("/delinquency/buckets/:id/edit", get(delinquency::edit_bucket))
        .route(
            "/delinquency/buckets/:id/delete",
            get(delinquency::confirm_delete_bucket).post(delinquency::delete_bucket),
        )
}
