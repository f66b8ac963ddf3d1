// Ambient configuration and the typed settings read from it
mod ambient;
mod settings;

pub use ambient::AmbientConfig;

pub use settings::{
    parse_bool,
    parse_duration,
    require_bucket,
    S3Settings,
    StaticCredentials,
    TransferSettings,
    VaultSettings,
};
