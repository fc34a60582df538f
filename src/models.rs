use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORIES: [&str; 5] = ["Flower", "Animal", "Geometry", "Line Work", "Traditional"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtworkStatus {
    Available,
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Open,
    Pending,
    WaitingPayment,
    Signing,
    Signed,
    Booked,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Open,
        AppointmentStatus::Pending,
        AppointmentStatus::WaitingPayment,
        AppointmentStatus::Signing,
        AppointmentStatus::Signed,
        AppointmentStatus::Booked,
        AppointmentStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Open => "OPEN",
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::WaitingPayment => "WAITING_PAYMENT",
            AppointmentStatus::Signing => "SIGNING",
            AppointmentStatus::Signed => "SIGNED",
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    Claimed,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArtworkRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub png_url: Option<String>,
    pub category: String,
    pub status: ArtworkStatus,
    pub price: Option<i64>,
    pub special_price: Option<i64>,
    pub tags: String,
    pub created_at: String,
    pub view_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub png_url: Option<String>,
    pub category: String,
    pub status: ArtworkStatus,
    pub price: Option<i64>,
    pub special_price: Option<i64>,
    pub created_at: String,
    pub tags: Vec<String>,
    pub view_count: i64,
}

impl From<ArtworkRow> for Artwork {
    fn from(row: ArtworkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            png_url: row.png_url,
            category: row.category,
            status: row.status,
            price: row.price,
            special_price: row.special_price.filter(|price| *price != 0),
            created_at: row.created_at,
            tags: split_tags(&row.tags),
            view_count: row.view_count,
        }
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Admin-supplied artwork. `status` is accepted for compatibility but never stored
/// as-is: availability always comes from appointment links.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkInput {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub png_url: Option<String>,
    #[serde(default)]
    pub category: String,
    pub status: Option<ArtworkStatus>,
    pub price: Option<i64>,
    pub special_price: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub date: String,
    pub time_slot: String,
    pub user_id: Option<String>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub artwork_id: Option<String>,
    pub artwork_title: Option<String>,
    pub artwork_image: Option<String>,
    pub total_price: Option<i64>,
    pub deposit_paid: Option<i64>,
    pub tattoo_position: Option<String>,
    pub tattoo_size: Option<String>,
    pub tattoo_color: Option<String>,
    pub consent_notes: Option<String>,
    pub signature_data: Option<String>,
    pub signed_at: Option<String>,
    pub signer_name: Option<String>,
    pub signer_phone: Option<String>,
    pub order_type: OrderType,
    pub created_at: String,
}

impl Appointment {
    pub fn linked_artwork(&self) -> Option<&str> {
        self.artwork_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn is_signed(&self) -> bool {
        self.signed_at
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

pub const APPOINTMENT_COLUMNS: &str = r#"id, date, time_slot, user_id, customer_name, phone_number, status, notes,
       artwork_id, artwork_title, artwork_image, total_price, deposit_paid,
       tattoo_position, tattoo_size, tattoo_color, consent_notes,
       signature_data, signed_at, signer_name, signer_phone, order_type, created_at"#;

/// Booking payload. Signature fields are absent: only the consent flow writes them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub id: String,
    pub date: String,
    pub time_slot: String,
    pub user_id: Option<String>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub artwork_id: Option<String>,
    pub artwork_title: Option<String>,
    pub artwork_image: Option<String>,
    pub total_price: Option<i64>,
    pub deposit_paid: Option<i64>,
    pub tattoo_position: Option<String>,
    pub tattoo_size: Option<String>,
    pub tattoo_color: Option<String>,
    pub consent_notes: Option<String>,
    pub order_type: Option<OrderType>,
}

impl AppointmentInput {
    pub fn linked_artwork(&self) -> Option<&str> {
        self.artwork_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type.unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub favorites: String,
    pub phone_number: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn favorite_ids(&self) -> Vec<String> {
        parse_favorites(&self.favorites)
    }
}

pub fn parse_favorites(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

pub const USER_COLUMNS: &str =
    "id, name, avatar_url, role, favorites, phone_number, last_login, created_at";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub favorites: Vec<String>,
    pub phone_number: Option<String>,
    pub last_login: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let favorites = row.favorite_ids();
        Self {
            id: row.id,
            name: row.name,
            avatar_url: row.avatar_url,
            role: row.role,
            favorites,
            phone_number: row.phone_number,
            last_login: row.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub user: User,
    pub favorite_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSyncInput {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub favorites: Option<Vec<String>>,
}
