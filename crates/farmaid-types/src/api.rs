use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ChatMessage, ChatThread, Notification, OrgSettings, TransactionStatus, User,
};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub name: String,
    pub token: String,
    pub demo: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterOrganizationRequest {
    pub contact_person: String,
    pub organization_name: String,
    pub contact_number: String,
    pub email: String,
    pub year_founded: i32,
    /// Blob URL returned by a prior certification upload.
    pub certification_url: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterOrganizationResponse {
    pub organization_id: Uuid,
}

// -- Chat --

/// Sidebar payload: every thread summary plus the derived unread set.
#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    pub threads: Vec<ChatThread>,
    pub unread: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Blob URL returned by a prior chat-image upload.
    #[serde(default)]
    pub image_url: Option<String>,
}

pub type MessageResponse = ChatMessage;

// -- Transactions / donations --

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// Free-text match against id, farmer, buyer/donor and crop.
    pub search: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: TransactionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmDonationRequest {
    pub note: String,
    /// Blob URL returned by a prior receipt upload, if any.
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmDonationResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub message: ChatMessage,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_notification_limit")]
    pub limit: u32,
}

fn default_notification_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNotificationRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: u32,
}

pub type NotificationResponse = Notification;

// -- Users --

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default = "default_user_limit")]
    pub limit: u32,
}

fn default_user_limit() -> u32 {
    10
}

pub type UserResponse = User;

// -- Analytics --

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTotal {
    /// "2025-04" style bucket.
    pub month: String,
    pub total_centavos: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryVolume {
    pub crop: String,
    pub transactions: u32,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub monthly_donations: Vec<MonthlyTotal>,
    pub volume_by_crop: Vec<CategoryVolume>,
    pub total_donors: u32,
    pub total_donated_centavos: i64,
    pub average_donation_centavos: i64,
    /// Month-over-month growth in percent; None when there is no prior month.
    pub donation_growth_pct: Option<f64>,
}

// -- Settings --

pub type SettingsResponse = OrgSettings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub account_name: String,
    pub account_email: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub app_notifications: bool,
}

// -- Export --

/// Full-collection backup, downloaded as farmaid-backup-{ts}.json.
#[derive(Debug, Serialize)]
pub struct BackupDocument {
    pub exported_at: DateTime<Utc>,
    pub collections: serde_json::Value,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub sha256: String,
    pub size: u64,
}
