use bundle_provider::{OrderPlacement, OrderStatusReport, PlaceOrderRequest, ProviderApi, ProviderError};

/// The two provider calls the fulfillment pipeline depends on.
///
/// [`ProviderApi`] is the production implementation.
#[allow(async_fn_in_trait)]
pub trait FulfillmentProvider {
    /// See [`ProviderApi::place_order`]. Network-level failures are reported in the placement outcome, not as errors.
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderPlacement, ProviderError>;

    async fn check_order_status(&self, id_or_reference: &str) -> Result<OrderStatusReport, ProviderError>;
}

impl FulfillmentProvider for ProviderApi {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderPlacement, ProviderError> {
        ProviderApi::place_order(self, request).await
    }

    async fn check_order_status(&self, id_or_reference: &str) -> Result<OrderStatusReport, ProviderError> {
        ProviderApi::check_order_status(self, id_or_reference).await
    }
}
