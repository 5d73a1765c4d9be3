pub mod asset_helpers;
pub mod post_helpers;
pub mod time_helpers;
