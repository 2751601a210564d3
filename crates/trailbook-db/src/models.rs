/// Database row types — these map directly to SQLite rows.
/// Distinct from the trailbook-types API models to keep the DB layer
/// independent of the wire format.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct StoryRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub story: String,
    /// JSON-encoded array of place names.
    pub visited_locations: String,
    /// Epoch milliseconds.
    pub visited_date: i64,
    pub image_url: String,
    pub is_favourite: bool,
    pub created_at: String,
}

impl StoryRow {
    pub fn locations(&self) -> serde_json::Result<Vec<String>> {
        serde_json::from_str(&self.visited_locations)
    }
}
