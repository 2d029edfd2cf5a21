use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::{Client, Config};

use crate::config::MirrorConfig;

const CREDENTIALS_SOURCE: &str = "bucket-mirror-env";

/// SDK configuration for the mirror's bucket. Credentials are always the
/// explicit pair from the environment; the default provider chain is never
/// consulted.
pub fn s3_config(config: &MirrorConfig) -> Config {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        CREDENTIALS_SOURCE,
    );

    let builder = Config::builder()
        .credentials_provider(credentials)
        .region(Region::new(config.region.clone()))
        .force_path_style(config.force_path_style);

    match &config.endpoint_url {
        Some(url) => builder.endpoint_url(url).build(),
        None => builder.build(),
    }
}

/// The returned client pools connections internally and is cheap to clone.
pub fn create_s3_client(config: &MirrorConfig) -> Client {
    Client::from_conf(s3_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mirror_config(extra: &[(&str, &str)]) -> MirrorConfig {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            ("ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("SECRET_ACCESS_KEY", "secret"),
            ("REGION", "eu-west-3"),
            ("BUCKET_NAME", "photos"),
        ]);
        vars.extend(extra.iter().copied());
        MirrorConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn region_comes_from_the_environment() {
        let config = s3_config(&mirror_config(&[]));
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-3"));
    }

    #[test]
    fn custom_endpoint_still_uses_the_configured_region() {
        let config = s3_config(&mirror_config(&[
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
            ("S3_FORCE_PATH_STYLE", "true"),
        ]));
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-3"));
    }
}
