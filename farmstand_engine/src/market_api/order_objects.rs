use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        CustomerSummary,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Paise,
        PaymentMethod,
        ProductId,
        ProductSummary,
        Role,
        UserId,
    },
    traits::MarketplaceError,
};

//--------------------------------------        Cart           ---------------------------------------------------------
/// One line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A client-submitted cart, i.e. the body of a checkout request.
///
/// There is no customer field: the buyer is always the authenticated caller. Unknown fields are rejected.
/// `total_price` is accepted so that existing clients keep working, but it is only compared against the total that
/// the store calculates. On the wire it is a decimal rupee amount, e.g. `270.5`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, with = "rupee_amount")]
    pub total_price: Option<Paise>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl Cart {
    pub fn new<S: Into<String>>(delivery_address: S) -> Self {
        Self { delivery_address: delivery_address.into(), ..Default::default() }
    }

    pub fn with_item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(CartItem::new(product_id, quantity));
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_total_price(mut self, total: Paise) -> Self {
        self.total_price = Some(total);
        self
    }

    /// Checks the cart's shape before any store access.
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if self.items.is_empty() {
            return Err(MarketplaceError::ValidationError("The order must contain at least one item".into()));
        }
        for item in &self.items {
            if !item.product_id.is_well_formed() {
                return Err(MarketplaceError::ValidationError(format!(
                    "Invalid product id: {}",
                    item.product_id.value()
                )));
            }
            if item.quantity <= 0 {
                return Err(MarketplaceError::ValidationError(format!(
                    "Quantity for product {} must be a positive integer, not {}",
                    item.product_id, item.quantity
                )));
            }
        }
        if self.delivery_address.trim().is_empty() {
            return Err(MarketplaceError::ValidationError("A delivery address is required".into()));
        }
        Ok(())
    }

    /// Validates the cart and binds it to the customer that is placing it.
    pub fn into_new_order(self, customer_id: UserId) -> Result<NewOrder, MarketplaceError> {
        self.validate()?;
        let items = self.items.into_iter().map(|i| OrderItem::new(i.product_id, i.quantity)).collect();
        let mut order = NewOrder::new(customer_id, items, self.delivery_address.trim());
        order.payment_method = self.payment_method.unwrap_or_default();
        order.contact_name = self.contact_name;
        order.contact_phone = self.contact_phone;
        order.client_total = self.total_price;
        Ok(order)
    }
}

/// The cart body sent by older storefront builds to the legacy checkout path. They always include the buyer's id,
/// which is discarded. The buyer is still the authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacyCart {
    #[serde(default, skip_serializing)]
    pub buyer_id: Option<serde_json::Value>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, with = "rupee_amount")]
    pub total_price: Option<Paise>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl From<LegacyCart> for Cart {
    fn from(legacy: LegacyCart) -> Self {
        Self {
            items: legacy.items,
            total_price: legacy.total_price,
            payment_method: legacy.payment_method,
            delivery_address: legacy.delivery_address,
            contact_name: legacy.contact_name,
            contact_phone: legacy.contact_phone,
        }
    }
}

mod rupee_amount {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::db_types::Paise;

    pub fn serialize<S: Serializer>(value: &Option<Paise>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(total) => serializer.serialize_some(&total.as_rupee_amount()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Paise>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|rupees| Paise::from_rupee_amount(rupees).map_err(D::Error::custom))
            .transpose()
    }
}

//--------------------------------------      Requester        ---------------------------------------------------------
/// The authenticated identity on whose behalf a query or status change is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub role: Role,
}

impl Requester {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Users act on their own behalf. Admins may act on behalf of anyone.
    pub fn acts_for(&self, owner: UserId) -> bool {
        self.is_admin() || self.id == owner
    }
}

//--------------------------------------      Order views      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub quantity: i64,
    /// `None` if the product record could not be found.
    pub product: Option<ProductSummary>,
}

/// An order, with the customer and product records joined in for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: UserId,
    /// `None` if the customer record could not be found.
    pub customer: Option<CustomerSummary>,
    pub items: Vec<OrderItemView>,
    pub total_price: Paise,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn assemble(
        order: Order,
        customers: &HashMap<UserId, CustomerSummary>,
        products: &HashMap<ProductId, ProductSummary>,
    ) -> Self {
        let items = order
            .items
            .iter()
            .map(|i| OrderItemView {
                product_id: i.product_id,
                quantity: i.quantity,
                product: products.get(&i.product_id).cloned(),
            })
            .collect();
        Self {
            id: order.id,
            customer_id: order.customer_id,
            customer: customers.get(&order.customer_id).cloned(),
            items,
            total_price: order.total_price,
            payment_method: order.payment_method,
            delivery_address: order.delivery_address,
            contact_name: order.contact_name,
            contact_phone: order.contact_phone,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    /// A view with no joined records. Used when the display join fails after an order has already been committed.
    pub fn bare(order: Order) -> Self {
        Self::assemble(order, &HashMap::new(), &HashMap::new())
    }
}
