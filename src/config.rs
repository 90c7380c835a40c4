use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Shared secret for the reminder sweep endpoint. Empty means the
    /// endpoint runs unauthenticated (development only).
    pub cron_secret: String,
    pub resend_api_key: String,
    pub from_email: String,
    pub owner_email: String,
    pub business_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "aura.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            cron_secret: env::var("CRON_SECRET").unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "bookings@auramobilemassage.com".to_string()),
            owner_email: env::var("OWNER_EMAIL").unwrap_or_default(),
            business_name: env::var("BUSINESS_NAME")
                .unwrap_or_else(|_| "Aura Mobile Massage".to_string()),
        }
    }
}
