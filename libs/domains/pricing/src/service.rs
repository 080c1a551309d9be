use futures::future::join_all;
use observability::{CatalogMetrics, OperationTimer};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::cache::{CacheStats, CatalogCache, CatalogSnapshot};
use crate::catalog::CatalogIndex;
use crate::config::PricingConfig;
use crate::error::{PricingError, PricingResult, QueryError};
use crate::export;
use crate::fetcher::{self, PriceListFetcher};
use crate::filter::{FilterClause, FilterSet};
use crate::models::{
    AttributeValues, AttributeValuesRequest, AttributeValuesResponse, CompareRequest,
    CompareResponse, ExportFormat, ExportOutput, Freshness, PriceListUrls, PriceRecord,
    QueryOptions, QueryRequest, QueryResponse, RegionComparison, TermType, UnitPrice,
};
use crate::pager;
use crate::region::currency_for_region;

/// Records included with a `ResultTooLarge` error
const SAMPLE_RECORDS: usize = 3;

/// Query engine facade: cache resolution, filter evaluation, paging and shaping
pub struct PricingService<F: PriceListFetcher> {
    fetcher: Arc<F>,
    cache: CatalogCache<F>,
    config: Arc<PricingConfig>,
}

impl<F: PriceListFetcher> Clone for PricingService<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            cache: self.cache.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

/// A query evaluated against one region's catalog
struct RegionQuery {
    response: QueryResponse,
    lowest_on_demand: Option<UnitPrice>,
}

impl<F: PriceListFetcher + 'static> PricingService<F> {
    /// Create a new pricing service with its own catalog cache
    pub fn new(fetcher: F, config: PricingConfig) -> Self {
        let fetcher = Arc::new(fetcher);
        let cache = CatalogCache::new(
            Arc::clone(&fetcher),
            config.cache_ttl,
            config.cache_max_entries,
        )
        .with_failure_backoff(config.failure_backoff);

        Self {
            fetcher,
            cache,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    fn resolve_region(&self, region: Option<&str>) -> String {
        region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.config.default_region)
            .to_string()
    }

    fn resolve_limit(&self, limit: Option<usize>) -> Result<usize, QueryError> {
        match limit {
            Some(0) => Err(QueryError::InvalidPagination { limit: 0 }),
            Some(limit) => Ok(limit.min(self.config.max_page_size)),
            None => Ok(self.config.default_page_size.min(self.config.max_page_size)),
        }
    }

    fn resolve_max_chars(&self, requested: Option<i64>) -> Result<Option<usize>, QueryError> {
        match requested {
            None => Ok(self.config.max_response_chars),
            Some(-1) => Ok(None),
            Some(n) if n > 0 => Ok(Some(n as usize)),
            Some(n) => Err(QueryError::Validation(format!(
                "max_response_chars must be positive or -1, got {n}"
            ))),
        }
    }

    /// Run a filtered, paged query against one (service, region) catalog
    #[instrument(skip(self, request), fields(service_code = %request.service_code))]
    pub async fn query(&self, request: QueryRequest) -> PricingResult<QueryResponse> {
        let mut timer = OperationTimer::new("query");
        let result = self.query_inner(request).await;
        timer.stop();
        CatalogMetrics::record_operation("query", status_label(&result));
        result
    }

    async fn query_inner(&self, request: QueryRequest) -> PricingResult<QueryResponse> {
        request.validate()?;
        let limit = self.resolve_limit(request.limit)?;
        let max_chars = self.resolve_max_chars(request.options.max_response_chars)?;
        let filters = FilterSet::compile(&request.filters)?;
        let region = self.resolve_region(request.region.as_deref());

        let outcome = self
            .query_region(
                &request.service_code,
                &region,
                &filters,
                request.offset,
                limit,
                &request.options,
                max_chars,
            )
            .await?;

        Ok(outcome.response)
    }

    #[allow(clippy::too_many_arguments)]
    async fn query_region(
        &self,
        service_code: &str,
        region: &str,
        filters: &FilterSet,
        offset: usize,
        limit: usize,
        options: &QueryOptions,
        max_chars: Option<usize>,
    ) -> PricingResult<RegionQuery> {
        let snapshot = self.cache.get_or_build(service_code, region).await?;
        let matches = shape(filters.evaluate(&snapshot.index), options);

        let currency = currency_for_region(region);
        let lowest_on_demand = matches
            .iter()
            .filter(|r| r.term_type() == Some(TermType::OnDemand))
            .filter_map(|r| r.lowest_price(currency))
            .min()
            .map(|amount| UnitPrice {
                currency: currency.to_string(),
                amount,
            });

        let page = pager::page(&matches, offset, limit)?.map(PriceRecord::clone);
        debug!(
            service_code = service_code,
            region = region,
            total_matches = page.total_matches,
            returned = page.records.len(),
            "Query evaluated"
        );

        if let Some(limit) = max_chars {
            let chars = serde_json::to_string(&page.records)
                .map_err(|e| PricingError::Internal(e.to_string()))?
                .chars()
                .count();
            if chars > limit {
                warn!(chars = chars, limit = limit, "Query result exceeds response limit");
                return Err(PricingError::ResultTooLarge {
                    chars,
                    limit,
                    sample: page.records.into_iter().take(SAMPLE_RECORDS).collect(),
                });
            }
        }

        Ok(RegionQuery {
            response: QueryResponse {
                service_code: service_code.to_string(),
                region: region.to_string(),
                records: page.records,
                next_offset: page.next_offset,
                total_matches: page.total_matches,
                freshness: snapshot.freshness(),
            },
            lowest_on_demand,
        })
    }

    /// Service codes from the bulk service index, optionally regex-filtered
    #[instrument(skip(self))]
    pub async fn service_codes(&self, filter: Option<&str>) -> PricingResult<Vec<String>> {
        let pattern = filter.map(compile_pattern).transpose()?;

        let codes = self.fetcher.fetch_service_index().await?;
        if codes.is_empty() {
            return Err(PricingError::NoMatches(
                "the service index returned no service codes".to_string(),
            ));
        }

        let codes = retain_matching(codes, pattern.as_ref());
        if codes.is_empty() {
            return Err(PricingError::NoMatches(format!(
                "no service codes match '{}'",
                filter.unwrap_or_default()
            )));
        }

        CatalogMetrics::record_operation("service_codes", "success");
        Ok(codes)
    }

    /// Regions a service publishes price lists for
    #[instrument(skip(self))]
    pub async fn service_regions(&self, service_code: &str) -> PricingResult<Vec<String>> {
        let regions = self.fetcher.fetch_region_index(service_code).await?;
        if regions.is_empty() {
            return Err(PricingError::NoMatches(format!(
                "{service_code} lists no regions"
            )));
        }

        CatalogMetrics::record_operation("service_regions", "success");
        Ok(regions)
    }

    /// Sorted attribute names of a catalog, optionally regex-filtered
    #[instrument(skip(self))]
    pub async fn service_attributes(
        &self,
        service_code: &str,
        region: Option<&str>,
        filter: Option<&str>,
    ) -> PricingResult<Vec<String>> {
        let pattern = filter.map(compile_pattern).transpose()?;
        let snapshot = self.resolve(service_code, region).await?;

        let names: Vec<String> = snapshot.index.attribute_names().map(str::to_string).collect();
        if names.is_empty() {
            return Err(PricingError::NoMatches(format!(
                "{service_code} has no attributes"
            )));
        }

        let names = retain_matching(names, pattern.as_ref());
        if names.is_empty() {
            return Err(PricingError::NoMatches(format!(
                "no attributes of {service_code} match '{}'",
                filter.unwrap_or_default()
            )));
        }

        CatalogMetrics::record_operation("service_attributes", "success");
        Ok(names)
    }

    /// Distinct values of each requested attribute, in request order.
    ///
    /// Fails as a whole if any requested attribute has no values at all.
    #[instrument(skip(self, request))]
    pub async fn attribute_values(
        &self,
        service_code: &str,
        request: AttributeValuesRequest,
    ) -> PricingResult<AttributeValuesResponse> {
        if request.attribute_names.is_empty() {
            return Err(QueryError::EmptyAttributeList.into());
        }

        let patterns = request
            .filters
            .iter()
            .filter(|(name, _)| request.attribute_names.contains(name))
            .map(|(name, pattern)| compile_pattern(pattern).map(|re| (name.as_str(), re)))
            .collect::<Result<BTreeMap<&str, Regex>, QueryError>>()?;

        let region = self.resolve_region(request.region.as_deref());
        let snapshot = self.cache.get_or_build(service_code, &region).await?;

        let mut attributes = Vec::with_capacity(request.attribute_names.len());
        for name in &request.attribute_names {
            let values = snapshot
                .index
                .values_of(name)
                .filter(|values| !values.is_empty())
                .ok_or_else(|| PricingError::NoAttributeValues {
                    service_code: service_code.to_string(),
                    attribute: name.clone(),
                })?;

            let values = retain_matching(
                values.iter().cloned().collect(),
                patterns.get(name.as_str()),
            );
            attributes.push(AttributeValues {
                attribute: name.clone(),
                values,
            });
        }

        CatalogMetrics::record_operation("attribute_values", "success");
        Ok(AttributeValuesResponse {
            service_code: service_code.to_string(),
            region,
            attributes,
        })
    }

    /// Evaluate one query in several regions concurrently.
    ///
    /// Region failures are reported per region; request errors fail the call.
    #[instrument(skip(self, request), fields(service_code = %request.service_code))]
    pub async fn compare_regions(&self, request: CompareRequest) -> PricingResult<CompareResponse> {
        request.validate()?;
        let limit = self.resolve_limit(request.limit)?;
        let max_chars = self.resolve_max_chars(request.options.max_response_chars)?;
        let filters = FilterSet::compile(&request.filters)?;

        let lookups = request.regions.iter().map(|region| {
            let region = self.resolve_region(Some(region.as_str()));
            let filters = &filters;
            let options = &request.options;
            let service_code = request.service_code.as_str();
            async move {
                let currency = currency_for_region(&region).to_string();
                match self
                    .query_region(service_code, &region, filters, 0, limit, options, max_chars)
                    .await
                {
                    Ok(outcome) => RegionComparison {
                        region,
                        currency,
                        lowest_on_demand: outcome.lowest_on_demand,
                        total_matches: outcome.response.total_matches,
                        records: outcome.response.records,
                        next_offset: outcome.response.next_offset,
                        freshness: Some(outcome.response.freshness),
                        error: None,
                    },
                    Err(err) => {
                        warn!(region = %region, error = %err, "Region comparison failed");
                        RegionComparison {
                            region,
                            currency,
                            lowest_on_demand: None,
                            total_matches: 0,
                            records: Vec::new(),
                            next_offset: None,
                            freshness: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
        });

        let regions = join_all(lookups).await;
        CatalogMetrics::record_operation("compare_regions", "success");

        Ok(CompareResponse {
            service_code: request.service_code,
            regions,
        })
    }

    /// Serialize every matching record of a catalog
    #[instrument(skip(self, filters))]
    pub async fn export(
        &self,
        service_code: &str,
        region: Option<&str>,
        filters: &[FilterClause],
        format: ExportFormat,
    ) -> PricingResult<ExportOutput> {
        let filters = FilterSet::compile(filters)?;
        let snapshot = self.resolve(service_code, region).await?;
        let index = &snapshot.index;

        let matches = filters.evaluate(index);
        let records = matches.len();
        let body = render(format, matches, index)?;

        info!(
            service_code = service_code,
            records = records,
            format = %format,
            "Exported catalog"
        );
        CatalogMetrics::record_operation("export", "success");

        Ok(ExportOutput {
            format,
            records,
            body,
        })
    }

    /// Bulk file URLs for a service/region; no network access
    pub fn price_list_urls(&self, service_code: &str, region: Option<&str>) -> PriceListUrls {
        let region = self.resolve_region(region);
        fetcher::price_list_urls(&self.config.base_url, service_code, &region)
    }

    /// Rebuild a catalog regardless of its age
    #[instrument(skip(self))]
    pub async fn refresh(&self, service_code: &str, region: Option<&str>) -> PricingResult<Freshness> {
        let region = self.resolve_region(region);
        let snapshot = self.cache.refresh(service_code, &region).await?;
        CatalogMetrics::record_operation("refresh", "success");
        Ok(snapshot.freshness())
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn resolve(&self, service_code: &str, region: Option<&str>) -> PricingResult<CatalogSnapshot> {
        let region = self.resolve_region(region);
        Ok(self.cache.get_or_build(service_code, &region).await?)
    }
}

/// Apply term-type and free-product options, keeping index order
fn shape<'a>(records: Vec<&'a PriceRecord>, options: &QueryOptions) -> Vec<&'a PriceRecord> {
    if options.pricing_terms.is_empty() && !options.exclude_free_products {
        return records;
    }

    records
        .into_iter()
        .filter(|r| {
            options.pricing_terms.is_empty()
                || r.term_type()
                    .is_some_and(|t| options.pricing_terms.contains(&t))
        })
        .filter(|r| !(options.exclude_free_products && r.is_free()))
        .collect()
}

fn render(
    format: ExportFormat,
    records: Vec<&PriceRecord>,
    index: &CatalogIndex,
) -> PricingResult<String> {
    match format {
        ExportFormat::Csv => {
            let names: Vec<&str> = index.attribute_names().collect();
            export::to_csv(records, &names)
        }
        ExportFormat::Jsonl => export::to_json_lines(records),
    }
}

/// Case-insensitive, unanchored regex
fn compile_pattern(pattern: &str) -> Result<Regex, QueryError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| QueryError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn retain_matching(mut items: Vec<String>, pattern: Option<&Regex>) -> Vec<String> {
    if let Some(pattern) = pattern {
        items.retain(|item| pattern.is_match(item));
    }
    items
}

fn status_label<T>(result: &PricingResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(PricingError::Query(_)) => "invalid",
        Err(_) => "error",
    }
}
