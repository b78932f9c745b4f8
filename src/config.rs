use std::env;

pub const DEFAULT_URI: &str = "mongodb://localhost:27017/";
pub const DEFAULT_DATABASE: &str = "onlineShop";

/// Connection settings, resolved from the environment with CLI overrides
/// applied on top by the caller.
#[derive(Debug, Clone)]
pub struct Settings {
    pub uri: String,
    pub database: String,
}

impl Settings {
    pub fn load() -> Self {
        let uri = env::var("MONGODB_URI").unwrap_or_else(|_| DEFAULT_URI.to_string());
        let database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        Settings { uri, database }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_demo_database() {
        assert_eq!(DEFAULT_URI, "mongodb://localhost:27017/");
        assert_eq!(DEFAULT_DATABASE, "onlineShop");
    }
}
