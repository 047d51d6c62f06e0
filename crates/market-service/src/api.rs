//! HTTP API for the listing table.
//!
//! Serves the shared table that a marketplace frontend reads and the
//! HTTP store backend writes through: the full listing list, lifecycle
//! writes for listings and sales, and a basic health endpoint. Image
//! URLs are rewritten through the configured IPFS gateway on the way
//! out.

use axum::{
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use market_store::{media::resolve_media_url, StoreError, StoreService};
use market_types::{ListingRecord, NewListing, SaleReport};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Listing store the endpoints read and write.
	pub store: Arc<StoreService>,
	/// Gateway prefix for rewriting ipfs:// image URLs.
	pub ipfs_gateway: String,
}

#[derive(Serialize)]
struct ListingsResponse {
	listings: Vec<ListingRecord>,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/listings", get(get_listings).post(create_listing))
		.route("/api/sales", post(record_sale))
		.route("/health", get(health_check))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Binds the listener and serves the API until `shutdown` resolves.
pub async fn serve(
	state: AppState,
	bind_address: &str,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let app = router(state);
	let listener = tokio::net::TcpListener::bind(bind_address).await?;

	info!("Listing API listening on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
	fn from(err: StoreError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = match &self.0 {
			StoreError::NotFound => StatusCode::NOT_FOUND,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};
		(status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
	}
}

async fn get_listings(
	State(state): State<AppState>,
) -> Result<Json<ListingsResponse>, ApiError> {
	let mut listings = state.store.listings().await?;
	for row in &mut listings {
		if let Some(image) = &row.image {
			row.image = Some(resolve_media_url(image, &state.ipfs_gateway));
		}
	}
	Ok(Json(ListingsResponse { listings }))
}

async fn create_listing(
	State(state): State<AppState>,
	Json(listing): Json<NewListing>,
) -> Result<StatusCode, ApiError> {
	info!(token_id = %listing.token_id, "recording listing");
	state.store.upsert_listing(listing).await?;
	Ok(StatusCode::NO_CONTENT)
}

async fn record_sale(
	State(state): State<AppState>,
	Json(sale): Json<SaleReport>,
) -> Result<StatusCode, ApiError> {
	info!(token_id = %sale.token_id, "recording sale");
	state.store.complete_sale(sale).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Basic health check - returns 200 if service is running
async fn health_check() -> StatusCode {
	StatusCode::OK
}
