use log::error;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::{Client, NoTls};
use url::Url;

use crate::error::SinkError;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, SinkError> {
    let mut builder = SslConnector::builder(SslMethod::tls())
        .map_err(|e| SinkError::Tls(format!("SSL builder error: {}", e)))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| SinkError::Tls(format!("Error loading CA cert: {}", e)))?;

    builder.set_verify(SslVerifyMode::PEER);

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` parameter out of a database URL
///
/// tokio-postgres doesn't understand `sslrootcert`, so it is removed from the
/// returned URL and handed back separately.
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>), SinkError> {
    let url = Url::parse(database_url)?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

/// Open a connection, using TLS when the URL names a root certificate
///
/// The connection task is spawned onto the runtime and ends when the client is dropped.
pub async fn connect(database_url: &str) -> Result<Client, SinkError> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            Ok(client)
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            Ok(client)
        }
    }
}
