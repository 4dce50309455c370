use std::env;
use std::ops::RangeInclusive;

use log::warn;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    /// Allowed CORS origins. A single `*` entry allows any origin.
    pub frontend_origins: Vec<String>,
}

const DEFAULT_SECRET: &str = "secret";

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the insecure default secret");
            DEFAULT_SECRET.to_string()
        });

        let frontend_origins = lookup("FRONTEND_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000),
            mongo_uri: lookup("MONGO_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "todo-List".to_string()),
            jwt_secret,
            token_ttl_days: parse_in_range(&lookup, "TOKEN_TTL_DAYS", 7, 1..=3650),
            bcrypt_cost: parse_in_range(&lookup, "BCRYPT_COST", 10, 4..=31),
            frontend_origins,
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.frontend_origins.iter().any(|origin| origin == "*")
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has unparseable value {:?}, falling back to {}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_in_range<F, T>(lookup: &F, key: &str, default: T, range: RangeInclusive<T>) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display + PartialOrd,
{
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{} = {} is outside {}..={}, falling back to {}",
            key,
            value,
            range.start(),
            range.end(),
            default
        );
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_with(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.mongo_uri, "mongodb://localhost:27017");
        assert_eq!(config.database_name, "todo-List");
        assert_eq!(config.jwt_secret, "secret");
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(
            config.frontend_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn environment_values_override_defaults() {
        let config = config_with(&[
            ("PORT", "8080"),
            ("JWT_SECRET", "s3cr3t"),
            ("FRONTEND_ORIGINS", " https://app.example.com , *"),
            ("TOKEN_TTL_DAYS", "1"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, "s3cr3t");
        assert_eq!(config.token_ttl_days, 1);
        assert_eq!(config.frontend_origins, vec!["https://app.example.com", "*"]);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn garbage_numbers_fall_back() {
        let config = config_with(&[("PORT", "eighty"), ("BCRYPT_COST", "-3")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.bcrypt_cost, 10);
    }

    #[test]
    fn out_of_range_lifetimes_and_costs_fall_back() {
        for ttl in ["0", "-1", "3651", "100000000", "999999999999999"] {
            let config = config_with(&[("TOKEN_TTL_DAYS", ttl)]);
            assert_eq!(config.token_ttl_days, 7, "TOKEN_TTL_DAYS={}", ttl);
        }
        assert_eq!(config_with(&[("TOKEN_TTL_DAYS", "3650")]).token_ttl_days, 3650);

        assert_eq!(config_with(&[("BCRYPT_COST", "3")]).bcrypt_cost, 10);
        assert_eq!(config_with(&[("BCRYPT_COST", "32")]).bcrypt_cost, 10);
        assert_eq!(config_with(&[("BCRYPT_COST", "4")]).bcrypt_cost, 4);
    }
}
