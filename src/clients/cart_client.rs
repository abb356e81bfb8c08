use crate::cart_actor::{CartAction, CartError, CartStore};
use crate::clients::actor_client::{downcast_entity_error, ActorClient};
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{CartBinding, CartLineItem, CartMode, CartState, LineId, Product, ProductId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

/// Client for interacting with the Cart actor.
///
/// Mutating methods queue behind each other on the actor and resolve with the state
/// after the operation. Read methods answer from the latest published state
/// immediately.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<CartStore>,
}

impl CartClient {
    pub fn new(inner: ResourceClient<CartStore>) -> Self {
        Self { inner }
    }

    async fn perform(&self, action: CartAction) -> Result<CartState, CartError> {
        self.inner
            .perform_action(action)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(
        &self,
        product: Product,
        quantity: u32,
        selected_size: Option<String>,
        selected_color: Option<String>,
    ) -> Result<CartState, CartError> {
        debug!(?product, "add_item called");
        self.perform(CartAction::AddItem {
            product,
            quantity,
            selected_size,
            selected_color,
        })
        .await
    }

    /// Sets a line's quantity; zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_item(&self, item_id: LineId, quantity: i64) -> Result<CartState, CartError> {
        self.perform(CartAction::UpdateItem { item_id, quantity })
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: LineId) -> Result<CartState, CartError> {
        self.perform(CartAction::RemoveItem(item_id)).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartState, CartError> {
        self.perform(CartAction::ClearCart).await
    }

    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<CartState, CartError> {
        self.perform(CartAction::Reload).await
    }

    pub async fn clear_error(&self) -> Result<CartState, CartError> {
        self.perform(CartAction::ClearError).await
    }

    /// Attaches the cart to `binding`. A bare [`CartMode`] binds with no owner.
    pub async fn switch_mode(
        &self,
        binding: impl Into<CartBinding>,
    ) -> Result<CartState, CartError> {
        let binding = binding.into();
        debug!(mode = %binding.mode, owner = ?binding.owner, "Cart switch requested");
        self.perform(CartAction::SwitchMode(binding)).await
    }

    /// Total quantity across all lines.
    pub fn get_cart_item_count(&self) -> u32 {
        self.state().item_count()
    }

    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.state().is_in_cart(product_id)
    }

    pub fn get_cart_item(&self, product_id: ProductId) -> Option<CartLineItem> {
        self.state().get_cart_item(product_id).cloned()
    }

    pub fn total(&self) -> Decimal {
        self.state().total()
    }

    /// Waits until the cart has settled in `mode`.
    pub async fn wait_for_mode(&self, mode: CartMode) -> Result<CartState, CartError> {
        let mut receiver = self.subscribe();
        let state = receiver
            .wait_for(|state| state.mode == mode && !state.loading)
            .await
            .map_err(|e| CartError::ActorCommunicationError(e.to_string()))?;
        Ok(state.clone())
    }
}

#[async_trait]
impl ActorClient<CartStore> for CartClient {
    type Error = CartError;

    fn inner(&self) -> &ResourceClient<CartStore> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        downcast_entity_error(e).unwrap_or_else(CartError::ActorCommunicationError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::{create_mock_client, expect_action, MockClient};
    use crate::model::CartLineItem;

    fn state_with(product: Product, quantity: u32) -> CartState {
        let mut state = CartState::with_mode(CartMode::Guest);
        state.merge_line(CartLineItem::guest(product, quantity, None, None));
        state
    }

    #[tokio::test]
    async fn test_reads_come_from_published_state() {
        let mock = MockClient::<CartStore>::new(CartState::default());
        let client = CartClient::new(mock.client());
        assert_eq!(client.get_cart_item_count(), 0);

        mock.publish(state_with(Product::new(9, "Aviator", Decimal::from(1200)), 2));
        assert_eq!(client.get_cart_item_count(), 2);
        assert!(client.is_in_cart(ProductId(9)));
        assert_eq!(client.total(), Decimal::from(2400));
        assert_eq!(
            client.get_cart_item(ProductId(9)).map(|line| line.id),
            Some(LineId::from("guest-9"))
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_add_item_sends_action() {
        let mut mock = MockClient::<CartStore>::new(CartState::default());
        mock.expect_action().return_ok(CartState::default());
        let client = CartClient::new(mock.client());

        client
            .add_item(Product::new(9, "Aviator", Decimal::from(1200)), 1, Some("M".into()), None)
            .await
            .unwrap();

        let actions = mock.received_actions();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].starts_with("AddItem"));
        mock.verify();
    }

    #[tokio::test]
    async fn test_entity_errors_keep_their_type() {
        let (client, mut rx, _state) = create_mock_client::<CartStore>(8, CartState::default());
        let client = CartClient::new(client);

        let call = tokio::spawn(async move { client.remove_item(LineId::from("guest-1")).await });
        let (action, respond_to) = expect_action(&mut rx).await.unwrap();
        assert!(matches!(action, CartAction::RemoveItem(ref id) if id.as_str() == "guest-1"));
        respond_to
            .send(Err(FrameworkError::EntityError(Box::new(CartError::ItemNotFound(
                LineId::from("guest-1"),
            )))))
            .unwrap();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_closed_actor_is_a_communication_error() {
        let (client, rx, _state) = create_mock_client::<CartStore>(8, CartState::default());
        drop(rx);
        let err = CartClient::new(client).clear_cart().await.unwrap_err();
        assert!(matches!(err, CartError::ActorCommunicationError(_)));
    }
}
