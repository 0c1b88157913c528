use serde::Deserialize;
use std::{fs, path::Path};
use url::Url;

use crate::Error;

/// Connection settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub magento_domain: String,
    pub api_user: String,
    pub api_key: String,
}

#[derive(Deserialize)]
struct RawConfig {
    magento_domain: Option<String>,
    api_user: Option<String>,
    api_key: Option<String>,
}

/// Which WSDL the server should describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `api/soap/?wsdl`
    V1,
    /// `api/soap/?wsdl=2`
    V1Wsdl2,
    /// `api/v2_soap/?wsdl`
    V2,
}

impl ApiVersion {
    fn path(self) -> &'static str {
        match self {
            ApiVersion::V1 => "api/soap/?wsdl",
            ApiVersion::V1Wsdl2 => "api/soap/?wsdl=2",
            ApiVersion::V2 => "api/v2_soap/?wsdl",
        }
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, Error> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or(Error::ConfigMissing(key))
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;

        let raw: RawConfig = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_owned(),
            source,
        })?;

        Ok(Self {
            magento_domain: required(raw.magento_domain, "magento_domain")?,
            api_user: required(raw.api_user, "api_user")?,
            api_key: required(raw.api_key, "api_key")?,
        })
    }

    pub fn wsdl_url(&self, version: ApiVersion) -> Result<Url, Error> {
        let domain = self.magento_domain.trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", domain, version.path()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_all_three_settings() {
        let file = config_file(
            r#"{"magento_domain": "https://shop.example.com/", "api_user": "soap", "api_key": "secret", "unused": 1}"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.magento_domain, "https://shop.example.com/");
        assert_eq!(config.api_user, "soap");
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn builds_wsdl_urls_for_each_variant() {
        let config = Config {
            magento_domain: "https://shop.example.com/".into(),
            api_user: "soap".into(),
            api_key: "secret".into(),
        };

        assert_eq!(
            config.wsdl_url(ApiVersion::V1).unwrap().as_str(),
            "https://shop.example.com/api/soap/?wsdl"
        );
        assert_eq!(
            config.wsdl_url(ApiVersion::V1Wsdl2).unwrap().as_str(),
            "https://shop.example.com/api/soap/?wsdl=2"
        );
        assert_eq!(
            config.wsdl_url(ApiVersion::V2).unwrap().as_str(),
            "https://shop.example.com/api/v2_soap/?wsdl"
        );
    }

    #[test]
    fn missing_or_empty_values_are_errors() {
        let file = config_file(r#"{"magento_domain": "https://shop.example.com", "api_user": "soap"}"#);
        assert!(matches!(
            Config::load(file.path()),
            Err(Error::ConfigMissing("api_key"))
        ));

        let file = config_file(r#"{"magento_domain": " ", "api_user": "soap", "api_key": "k"}"#);
        assert!(matches!(
            Config::load(file.path()),
            Err(Error::ConfigMissing("magento_domain"))
        ));
    }

    #[test]
    fn unreadable_or_invalid_files_are_errors() {
        let file = config_file("{ not json");
        assert!(matches!(Config::load(file.path()), Err(Error::ConfigParse { .. })));

        let directory = tempfile::tempdir().unwrap();
        let missing = directory.path().join("config.json");
        assert!(matches!(Config::load(&missing), Err(Error::ConfigRead { .. })));
    }
}
