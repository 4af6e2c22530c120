use datalist_core::{
    driver::{Connection, Driver, Flavor},
    Result,
};
use std::borrow::Cow;
use url::Url;

/// Picks the driver for a connection URL by its scheme.
#[derive(Debug)]
pub struct Connect {
    url: Url,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(anyhow::Error::from)?;
        Ok(Self { url })
    }
}

impl Driver for Connect {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.url.as_str())
    }

    fn flavor(&self) -> Flavor {
        match self.url.scheme() {
            "mysql" => Flavor::Mysql,
            "postgresql" | "postgres" => Flavor::Postgresql,
            _ => Flavor::Sqlite,
        }
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        match self.url.scheme() {
            "sqlite" => connect_sqlite(&self.url),
            scheme => Err(anyhow::anyhow!(
                "unsupported database; scheme={scheme}; url={}",
                self.url
            )
            .into()),
        }
    }
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &Url) -> Result<Box<dyn Connection>> {
    datalist_driver_sqlite::Sqlite::new(url.as_str())?.connect()
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &Url) -> Result<Box<dyn Connection>> {
    Err(anyhow::anyhow!("`sqlite` feature not enabled").into())
}
