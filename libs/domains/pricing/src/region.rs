/// Region used when a request does not name one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Currency AWS publishes prices in for a region.
///
/// China regions are priced in CNY, every other partition in USD.
pub fn currency_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "CNY"
    } else {
        "USD"
    }
}
