use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use farmstand_common::Paise;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------      Identifiers      ---------------------------------------------------------
macro_rules! db_id {
    ($name:ident, $label:literal) => {
        #[doc = concat!("Database identifier for a ", $label, " record.")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }

            /// Ids are assigned by the database and are always positive.
            pub fn is_well_formed(&self) -> bool {
                self.0 > 0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ConversionError(format!("Invalid {} id '{s}': {e}", $label)))?;
                let id = Self(id);
                if id.is_well_formed() {
                    Ok(id)
                } else {
                    Err(ConversionError(format!("Invalid {} id '{s}': ids must be positive", $label)))
                }
            }
        }
    };
}

db_id!(UserId, "user");
db_id!(ProductId, "product");
db_id!(OrderId, "order");

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Farmer,
    Retailer,
    Admin,
}

impl Role {
    /// Farmers and retailers list products and see the orders placed against them.
    pub fn is_seller(&self) -> bool {
        matches!(self, Role::Farmer | Role::Retailer)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Farmer => write!(f, "farmer"),
            Role::Retailer => write!(f, "retailer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "farmer" => Ok(Self::Farmer),
            "retailer" => Ok(Self::Retailer),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------         User          ---------------------------------------------------------
/// A user profile. Users are provisioned by the authentication service; the marketplace only reads them to build
/// customer summaries for orders.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub location: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S, email: S, role: Role, location: S) -> Self {
        Self { name: name.into(), email: email.into(), role, phone: None, location: location.into() }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Paise,
    pub unit: String,
    pub stock: i64,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub owner_id: UserId,
    /// Incremented once for every order line that references this product.
    pub buyers_count: i64,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub price: Paise,
    pub unit: String,
    pub stock: i64,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub visible: bool,
}

impl NewProduct {
    pub fn new<S: Into<String>>(owner_id: UserId, name: S, price: Paise, stock: i64) -> Self {
        Self {
            owner_id,
            name: name.into(),
            description: None,
            price,
            unit: "unit".to_string(),
            stock,
            image_url: None,
            video_url: None,
            visible: true,
        }
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been placed and stock has been reserved for it.
    #[default]
    Pending,
    /// A seller has accepted the order.
    Confirmed,
    /// The order has been handed over to the customer.
    Delivered,
    /// The order has been cancelled by a seller or an admin.
    Cancelled,
}

impl OrderStatusType {
    /// Whether `next` may follow `self` in the forward-only lifecycle:
    ///
    /// | From \ To | Pending | Confirmed | Delivered | Cancelled |
    /// |-----------|---------|-----------|-----------|-----------|
    /// | Pending   | ✔       | ✔         |           | ✔         |
    /// | Confirmed |         | ✔         | ✔         | ✔         |
    /// | Delivered |         |           | ✔         |           |
    /// | Cancelled |         |           |           | ✔         |
    ///
    /// Only used when strict status transitions are enabled.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        if *self == next {
            return true;
        }
        matches!((self, next), (Pending, Confirmed) | (Confirmed, Delivered) | (Pending | Confirmed, Cancelled))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Confirmed => write!(f, "confirmed"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
/// How the customer intends to pay. This is a label only; no payment is captured by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Online,
    #[default]
    Cod,
    Upi,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Online => write!(f, "online"),
            PaymentMethod::Cod => write!(f, "cod"),
            PaymentMethod::Upi => write!(f, "upi"),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
/// One line of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    /// Line items in the order in which they were submitted. Loaded from the `order_items` table.
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    pub total_price: Paise,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(|i| i.product_id)
    }
}

/// A validated order that has not been placed yet. The customer id must come from an authenticated session.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    /// The total the client calculated. It is compared against the authoritative total, but never stored.
    pub client_total: Option<Paise>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(customer_id: UserId, items: Vec<OrderItem>, delivery_address: S) -> Self {
        Self {
            customer_id,
            items,
            payment_method: PaymentMethod::default(),
            delivery_address: delivery_address.into(),
            contact_name: None,
            contact_phone: None,
            client_total: None,
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------   Display summaries   ---------------------------------------------------------
/// The subset of a user's profile that is shown alongside an order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: String,
}

/// The subset of a product that is shown alongside an order line.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Paise,
    pub unit: String,
    pub owner_id: UserId,
}
