pub mod assets_db_operations;
pub mod portfolio_db_operations;
pub mod posts_db_operations;
pub mod site_db_operations;
pub mod taxonomy_db_operations;
pub mod users_db_operations;
