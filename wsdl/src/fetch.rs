use std::fs;
use tracing::debug;

use super::{error, resolve_url};

/// Reads a WSDL from an `http`, `https` or `file` URL, or from a local path.
pub fn fetch<S: AsRef<str>>(location: S) -> Result<Vec<u8>, error::Error> {
    let url = resolve_url(location)?;
    let scheme = url.scheme().to_owned();
    debug!(%url, "fetching WSDL");

    match scheme.as_str() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| error::Error::PathConversionError(None))?;
            fs::read(path).map_err(error::Error::FileReadError)
        }

        "http" | "https" => {
            let response = reqwest::blocking::get(url)?;
            let status = response.status();

            if !status.is_success() {
                return Err(error::Error::HttpStatus(status.as_u16()));
            }

            Ok(response.bytes()?.to_vec())
        }

        other => Err(error::Error::UnsupportedScheme(other.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_local_paths_and_file_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<definitions/>").unwrap();

        let path = file.path().to_str().unwrap().to_owned();
        assert_eq!(fetch(&path).unwrap(), b"<definitions/>");

        let url = url::Url::from_file_path(file.path()).unwrap();
        assert_eq!(fetch(url.as_str()).unwrap(), b"<definitions/>");
    }

    #[test]
    fn rejects_unknown_schemes_and_missing_files() {
        assert!(matches!(
            fetch("ftp://example.com/service.wsdl"),
            Err(error::Error::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
        assert!(matches!(
            fetch("does/not/exist.wsdl"),
            Err(error::Error::PathConversionError(Some(_)))
        ));
    }
}
