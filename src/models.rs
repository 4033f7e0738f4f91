use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    pub supplier: Option<String>,
    pub date_received: NaiveDate,
    pub lifespan_days: i64,
    pub low_stock_threshold: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    pub supplier: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub lifespan_days: i64,
    pub low_stock_threshold: Option<i64>,
}

/// Descriptive fields a product edit may touch. Stock is not one of them;
/// a `quantity` key in an edit payload is dropped on parse.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductEdit {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub supplier: Option<String>,
    pub lifespan_days: Option<i64>,
    pub low_stock_threshold: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub product_id: i64,
    pub quantity: i64,
}

// ===== SALES =====

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Retail,
    Event,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Event => "event",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "retail" => Some(Self::Retail),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    EWallet,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::EWallet => "e_wallet",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "bank_transfer" => Some(Self::BankTransfer),
            "e_wallet" => Some(Self::EWallet),
            _ => None,
        }
    }
}

/// A cart line as sent by the register. Bouquets arrive as `composite`
/// lines carrying the flowers they consume.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CartLine {
    Simple(SimpleLine),
    Composite(CompositeLine),
}

impl CartLine {
    pub fn quantity(&self) -> i64 {
        match self {
            Self::Simple(line) => line.quantity,
            Self::Composite(line) => line.quantity,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Self::Simple(line) => line.price,
            Self::Composite(line) => line.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleLine {
    pub product_id: i64,
    pub name: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLine {
    /// Always stored as null: a bouquet is not a product row.
    #[serde(default)]
    pub product_id: Option<i64>,
    pub name: String,
    #[serde(default = "one")]
    pub quantity: i64,
    pub price: f64,
    pub components: Vec<Component>,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub product_id: i64,
    pub name: Option<String>,
    pub quantity: i64,
}

/// Flat (product, quantity) pair the stock ledger deducts against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub product_id: i64,
    pub quantity: i64,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub event_id: Option<i64>,
    pub customer_name: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub transaction_type: TransactionType,
    pub items: Vec<CartLine>,
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub discount_amount: f64,
    pub total_amount: Option<f64>,
    pub payment_method: PaymentMethod,
    pub event_details: Option<EventDetails>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub items: Vec<CartLine>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub event_details: Option<EventDetails>,
    pub created_at: DateTime<Utc>,
}

// ===== EVENTS =====

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    FullyPaid,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::FullyPaid => "FullyPaid",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "FullyPaid" => Some(Self::FullyPaid),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Product line of an event, priced at the time it was ordered.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventProduct {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventProductInput {
    pub product_id: i64,
    pub quantity: i64,
    /// Falls back to the catalog price when absent.
    pub price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: f64,
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventTotals {
    pub total_amount: f64,
    pub total_paid: f64,
    pub remaining_balance: f64,
    pub status: EventStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub customer_name: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub venue: Option<String>,
    pub notes: Option<String>,
    pub event_date: NaiveDate,
    pub products: Vec<EventProduct>,
    pub payment_history: Vec<Payment>,
    #[serde(flatten)]
    pub totals: EventTotals,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub customer_name: String,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub venue: Option<String>,
    pub notes: Option<String>,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub products: Vec<EventProductInput>,
    pub deposit: Option<NewPayment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub customer_name: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub venue: Option<String>,
    pub notes: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub products: Option<Vec<EventProductInput>>,
    pub payment: Option<NewPayment>,
}

// ===== SPOILAGE & REPORTS =====

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpoiledLot {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub quantity_spoiled: i64,
    pub supplier: Option<String>,
    pub date_received: NaiveDate,
    pub expired_on: NaiveDate,
    pub date_spoiled: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub as_of: NaiveDate,
    pub processed: usize,
    pub lots: Vec<SpoiledLot>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub date: NaiveDate,
    pub total_transactions: i64,
    pub retail_transactions: i64,
    pub event_transactions: i64,
    pub gross_sales: f64,
    pub total_discounts: f64,
    pub net_sales: f64,
    pub units_spoiled: i64,
}
