//! HTTP handlers for the pricing query engine

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::cache::{CacheStats, CachedCatalog};
use crate::error::PricingResult;
use crate::fetcher::PriceListFetcher;
use crate::filter::{FilterClause, FilterType, FilterValue};
use crate::models::{
    AttributeValues, AttributeValuesRequest, AttributeValuesResponse, CompareRequest,
    CompareResponse, DiscoveryParams, ExportFormat, ExportOutput, ExportParams, ExportRequest,
    Freshness, PriceDimension,
    PriceListUrls, PriceRecord, PriceTerm, QueryOptions, QueryRequest, QueryResponse,
    RegionComparison, RegionParams, ReservedTerm, TermType, UnitPrice,
};
use crate::service::PricingService;

pub const TAG: &str = "pricing";

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

/// OpenAPI documentation for the Pricing API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_services,
        list_regions,
        list_attributes,
        attribute_values,
        query,
        compare,
        export,
        export_filtered,
        price_list_urls,
        refresh,
    ),
    components(
        schemas(
            ErrorBody,
            FilterClause,
            FilterType,
            FilterValue,
            TermType,
            ReservedTerm,
            PriceTerm,
            UnitPrice,
            PriceDimension,
            PriceRecord,
            Freshness,
            QueryOptions,
            QueryRequest,
            QueryResponse,
            AttributeValuesRequest,
            AttributeValues,
            AttributeValuesResponse,
            CompareRequest,
            RegionComparison,
            CompareResponse,
            ExportFormat,
            ExportRequest,
            PriceListUrls,
            CacheStats,
            CachedCatalog,
        )
    ),
    tags(
        (name = TAG, description = "AWS bulk price list queries")
    )
)]
pub struct ApiDoc;

/// Create the pricing router with all HTTP endpoints
pub fn router<F: PriceListFetcher + 'static>(service: PricingService<F>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        // Discovery
        .route("/services", get(list_services))
        .route("/services/{service}/regions", get(list_regions))
        .route("/services/{service}/attributes", get(list_attributes))
        .route("/services/{service}/attribute-values", post(attribute_values))
        // Queries
        .route("/query", post(query))
        .route("/compare", post(compare))
        // Bulk data
        .route(
            "/services/{service}/export",
            get(export).post(export_filtered),
        )
        .route("/services/{service}/urls", get(price_list_urls))
        .route("/services/{service}/refresh", post(refresh))
        .with_state(shared_service)
}

/// List service codes with a published price list
#[utoipa::path(
    get,
    path = "/services",
    tag = TAG,
    params(DiscoveryParams),
    responses(
        (status = 200, description = "Service codes", body = Vec<String>),
        (status = 400, description = "Invalid regex", body = ErrorBody),
        (status = 404, description = "No service matches", body = ErrorBody),
        (status = 503, description = "Pricing API unavailable", body = ErrorBody)
    )
)]
async fn list_services<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Query(params): Query<DiscoveryParams>,
) -> PricingResult<Json<Vec<String>>> {
    let codes = service.service_codes(params.filter.as_deref()).await?;
    Ok(Json(codes))
}

/// List regions a service is priced in
#[utoipa::path(
    get,
    path = "/services/{service}/regions",
    tag = TAG,
    params(("service" = String, Path, description = "Service code, e.g. AmazonEC2")),
    responses(
        (status = 200, description = "Region codes", body = Vec<String>),
        (status = 404, description = "Unknown service", body = ErrorBody)
    )
)]
async fn list_regions<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
) -> PricingResult<Json<Vec<String>>> {
    let regions = service.service_regions(&service_code).await?;
    Ok(Json(regions))
}

/// List the attribute names of a service's catalog
#[utoipa::path(
    get,
    path = "/services/{service}/attributes",
    tag = TAG,
    params(
        ("service" = String, Path, description = "Service code"),
        DiscoveryParams
    ),
    responses(
        (status = 200, description = "Sorted attribute names", body = Vec<String>),
        (status = 400, description = "Invalid regex", body = ErrorBody),
        (status = 404, description = "No price list or no matching attribute", body = ErrorBody)
    )
)]
async fn list_attributes<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Query(params): Query<DiscoveryParams>,
) -> PricingResult<Json<Vec<String>>> {
    let names = service
        .service_attributes(
            &service_code,
            params.region.as_deref(),
            params.filter.as_deref(),
        )
        .await?;
    Ok(Json(names))
}

/// Distinct values of the requested attributes
#[utoipa::path(
    post,
    path = "/services/{service}/attribute-values",
    tag = TAG,
    params(("service" = String, Path, description = "Service code")),
    request_body = AttributeValuesRequest,
    responses(
        (status = 200, description = "Values per attribute, in request order", body = AttributeValuesResponse),
        (status = 400, description = "Empty attribute list or invalid regex", body = ErrorBody),
        (status = 404, description = "An attribute has no values", body = ErrorBody)
    )
)]
async fn attribute_values<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Json(request): Json<AttributeValuesRequest>,
) -> PricingResult<Json<AttributeValuesResponse>> {
    let response = service.attribute_values(&service_code, request).await?;
    Ok(Json(response))
}

/// Filtered, paged price records
#[utoipa::path(
    post,
    path = "/query",
    tag = TAG,
    request_body = QueryRequest,
    responses(
        (status = 200, description = "One page of matching records", body = QueryResponse),
        (status = 400, description = "Invalid filter or pagination", body = ErrorBody),
        (status = 404, description = "No published price list", body = ErrorBody),
        (status = 413, description = "Page exceeds the response size limit", body = ErrorBody),
        (status = 502, description = "Unparseable price list", body = ErrorBody),
        (status = 503, description = "Pricing API unavailable", body = ErrorBody)
    )
)]
async fn query<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Json(request): Json<QueryRequest>,
) -> PricingResult<Json<QueryResponse>> {
    let response = service.query(request).await?;
    Ok(Json(response))
}

/// Same query across regions
#[utoipa::path(
    post,
    path = "/compare",
    tag = TAG,
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Per-region results", body = CompareResponse),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
async fn compare<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Json(request): Json<CompareRequest>,
) -> PricingResult<Json<CompareResponse>> {
    let response = service.compare_regions(request).await?;
    Ok(Json(response))
}

/// Download a whole catalog as CSV or JSON lines. Use `POST` on the same path to filter.
#[utoipa::path(
    get,
    path = "/services/{service}/export",
    tag = TAG,
    params(
        ("service" = String, Path, description = "Service code"),
        ExportParams
    ),
    responses(
        (status = 200, description = "Serialized catalog", body = String, content_type = "text/csv"),
        (status = 404, description = "No published price list", body = ErrorBody)
    )
)]
async fn export<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Query(params): Query<ExportParams>,
) -> PricingResult<impl IntoResponse> {
    let output = service
        .export(&service_code, params.region.as_deref(), &[], params.format)
        .await?;
    Ok(export_response(output))
}

/// Download the records matching a filter set as CSV or JSON lines
#[utoipa::path(
    post,
    path = "/services/{service}/export",
    tag = TAG,
    params(("service" = String, Path, description = "Service code")),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Serialized matching records", body = String, content_type = "text/csv"),
        (status = 400, description = "Invalid filter", body = ErrorBody),
        (status = 404, description = "No published price list", body = ErrorBody)
    )
)]
async fn export_filtered<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Json(request): Json<ExportRequest>,
) -> PricingResult<impl IntoResponse> {
    let output = service
        .export(
            &service_code,
            request.region.as_deref(),
            &request.filters,
            request.format,
        )
        .await?;
    Ok(export_response(output))
}

fn export_response(output: ExportOutput) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, output.format.content_type())],
        output.body,
    )
}

/// Bulk file locations; does not contact the pricing API
#[utoipa::path(
    get,
    path = "/services/{service}/urls",
    tag = TAG,
    params(
        ("service" = String, Path, description = "Service code"),
        RegionParams
    ),
    responses(
        (status = 200, description = "CSV and JSON price list URLs", body = PriceListUrls)
    )
)]
async fn price_list_urls<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Query(params): Query<RegionParams>,
) -> Json<PriceListUrls> {
    Json(service.price_list_urls(&service_code, params.region.as_deref()))
}

/// Rebuild a cached catalog now
#[utoipa::path(
    post,
    path = "/services/{service}/refresh",
    tag = TAG,
    params(
        ("service" = String, Path, description = "Service code"),
        RegionParams
    ),
    responses(
        (status = 200, description = "Freshness of the rebuilt catalog", body = Freshness),
        (status = 404, description = "No published price list", body = ErrorBody),
        (status = 503, description = "Pricing API unavailable and nothing cached", body = ErrorBody)
    )
)]
async fn refresh<F: PriceListFetcher + 'static>(
    State(service): State<Arc<PricingService<F>>>,
    Path(service_code): Path<String>,
    Query(params): Query<RegionParams>,
) -> PricingResult<Json<Freshness>> {
    let freshness = service
        .refresh(&service_code, params.region.as_deref())
        .await?;
    Ok(Json(freshness))
}
