use serde::{Deserialize, Deserializer, Serialize};

pub mod db_operations;

/// Admin account as exposed over the API. The password hash never leaves the
/// db_operations layer.
#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Login id (email).
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

// --- Taxonomy ---

#[derive(Debug, Serialize, Clone)]
pub struct Category {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

#[derive(Deserialize)]
pub struct CategoryCreate {
    #[serde(default)]
    pub name: String,
    pub parent_id: Option<i64>,
    pub sort_order: Option<i64>,
}

/// Distinguishes an absent `parent_id` key from an explicit `null` so a
/// partial update can leave the parent untouched.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
    pub sort_order: Option<i64>,
}

#[derive(Deserialize)]
pub struct ReorderItem {
    pub id: i64,
    pub sort_order: i64,
}

#[derive(Deserialize)]
pub struct ReorderBody {
    pub order: Vec<ReorderItem>,
}

/// Reorder payload used by careers/projects: position in the list becomes
/// the sort order.
#[derive(Deserialize)]
pub struct IdOrderBody {
    #[serde(default)]
    pub id_order: Vec<i64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub post_count: i64,
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize)]
pub struct PostPrefix {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
    pub created_at: Option<String>,
    pub post_count: i64,
}

#[derive(Deserialize)]
pub struct PostPrefixCreate {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct PostPrefixUpdate {
    pub name: Option<String>,
}

// --- Posts ---

#[derive(Deserialize)]
pub struct PostBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub published_at: Option<String>,
    pub category_id: Option<i64>,
    pub prefix_id: Option<i64>,
    pub thumbnail_asset_id: Option<i64>,
    pub content_html: Option<String>,
    pub content_json: Option<String>,
    #[serde(default)]
    pub post_tags: Vec<i64>,
    #[serde(default)]
    pub attachment_asset_ids: Vec<i64>,
}

fn default_status() -> String {
    "DRAFT".to_string()
}

#[derive(Serialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct PostListItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category: Option<CategoryRef>,
    pub view_count: i64,
}

#[derive(Serialize)]
pub struct PostListResponse {
    pub items: Vec<PostListItem>,
    pub total: i64,
}

#[derive(Serialize)]
pub struct AttachmentOut {
    pub id: i64,
    pub original_name: String,
    pub url: Option<String>,
    pub size_bytes: i64,
}

#[derive(Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub published_at: Option<String>,
    pub category_id: Option<i64>,
    pub prefix_id: Option<i64>,
    pub prefix_name: Option<String>,
    pub thumbnail_asset_id: Option<i64>,
    pub content_html: Option<String>,
    pub content_json: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub category_name: Option<String>,
    pub view_count: i64,
    pub post_tags: Vec<i64>,
    pub tags: Vec<Tag>,
    pub attachments: Vec<AttachmentOut>,
}

#[derive(Serialize)]
pub struct NeighborPost {
    pub id: i64,
    pub title: String,
}

#[derive(Serialize)]
pub struct NeighborsResponse {
    pub prev: Option<NeighborPost>,
    pub next: Option<NeighborPost>,
}

// --- Careers & projects ---

#[derive(Debug, Deserialize, Clone)]
pub struct LinkItem {
    pub link_name: String,
    pub link_url: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Serialize)]
pub struct LinkOut {
    pub id: i64,
    pub link_name: String,
    pub link_url: String,
    pub sort_order: i64,
}

#[derive(Serialize)]
pub struct HighlightOut {
    pub id: i64,
    pub content: String,
    pub sort_order: i64,
}

#[derive(Deserialize)]
pub struct CareerBody {
    pub logo_asset_id: Option<i64>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub role: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub career_links: Vec<LinkItem>,
    #[serde(default)]
    pub career_highlights: Vec<String>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub career_tags: Vec<i64>,
}

#[derive(Serialize)]
pub struct CareerOut {
    pub id: i64,
    pub logo_asset_id: Option<i64>,
    pub logo: Option<String>,
    pub company_name: String,
    pub role: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub sort_order: i64,
    pub links: Vec<LinkOut>,
    pub highlights: Vec<HighlightOut>,
    pub tags: Vec<Tag>,
}

#[derive(Deserialize)]
pub struct ProjectBody {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub thumbnail_asset_id: Option<i64>,
    pub intro_image_asset_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub project_links: Vec<LinkItem>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub project_tags: Vec<i64>,
}

#[derive(Serialize)]
pub struct ProjectOut {
    pub id: i64,
    pub thumbnail_asset_id: Option<i64>,
    pub thumbnail: Option<String>,
    pub intro_image_asset_id: Option<i64>,
    pub intro_image: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_order: i64,
    pub links: Vec<LinkOut>,
    pub tags: Vec<Tag>,
}

/// Tag id lists arrive from the editor as numbers or numeric strings; anything
/// else (and zero) is dropped rather than rejected.
fn lenient_id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdOrString {
        Id(i64),
        Text(String),
    }

    let raw = Option::<Vec<IdOrString>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|v| match v {
            IdOrString::Id(n) => Some(n),
            IdOrString::Text(s) => s.trim().parse::<i64>().ok(),
        })
        .filter(|&n| n != 0)
        .collect())
}

// --- About & dashboard ---

#[derive(Serialize)]
pub struct AboutMessage {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Deserialize)]
pub struct AboutMessageBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Deserialize)]
pub struct IntroBody {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct DashboardStats {
    pub today_visits: i64,
    pub total_views: i64,
    pub published_posts: i64,
}

#[derive(Serialize)]
pub struct RecentPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub updated_at: Option<String>,
    pub category_name: Option<String>,
    pub view_count: i64,
}

// --- Assets ---

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    pub original_name: String,
}
