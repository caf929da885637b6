// src/clickhouse/mod.rs

use anyhow::{bail, Context, Result};
use arrow::datatypes::Schema as ArrowSchema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::config::Credentials;

const USER_HEADER: &str = "X-ClickHouse-User";
const KEY_HEADER: &str = "X-ClickHouse-Key";

/// A single session against the ClickHouse HTTP interface.
///
/// There is no pooling and no retry: every call is one HTTP request, and the
/// underlying client is released when the handle is dropped.
pub struct ClickHouse {
    http: Client,
    url: Url,
    credentials: Credentials,
}

impl ClickHouse {
    /// Open a session and verify it with `SELECT version()`, failing fast if
    /// the server is unreachable or rejects the credentials.
    pub async fn connect(url: Url, credentials: Credentials) -> Result<Self> {
        info!(url = %url, user = %credentials.user, "connecting to ClickHouse");
        let http = Client::builder()
            .build()
            .context("building HTTP client")?;
        let client = Self {
            http,
            url,
            credentials,
        };

        let version = client
            .command("SELECT version()")
            .await
            .with_context(|| format!("connecting to ClickHouse at {}", client.url))?;
        info!(version = %version, "connected");
        Ok(client)
    }

    /// Run one raw SQL statement. The (trimmed) response body is returned;
    /// DDL statements answer with an empty string.
    pub async fn command(&self, sql: &str) -> Result<String> {
        debug!(sql = %sql, "command");
        let resp = self
            .request()
            .body(sql.to_string())
            .send()
            .await
            .context("sending command to ClickHouse")?;
        let text = check(resp).await?;
        Ok(text.trim().to_string())
    }

    /// Bulk insert the whole `batch` into `table` in one request.
    ///
    /// The batch travels as an in-memory Parquet file, with the column list
    /// taken from the batch schema so ClickHouse maps columns by name.
    pub async fn insert_batch(&self, table: &str, batch: &RecordBatch) -> Result<()> {
        let start = Instant::now();
        let query = insert_query(table, &batch.schema());
        let body = encode_parquet(batch)
            .with_context(|| format!("encoding {} rows for {}", batch.num_rows(), table))?;
        info!(
            table = %table,
            rows = batch.num_rows(),
            bytes = body.len(),
            "inserting"
        );

        let resp = self
            .request()
            .query(&[("query", query.as_str())])
            .body(body)
            .send()
            .await
            .with_context(|| format!("sending insert for {}", table))?;
        check(resp)
            .await
            .with_context(|| format!("inserting into {}", table))?;

        info!(table = %table, elapsed = ?start.elapsed(), "inserted");
        Ok(())
    }

    fn request(&self) -> RequestBuilder {
        self.http
            .post(self.url.clone())
            .header(USER_HEADER, &self.credentials.user)
            .header(KEY_HEADER, &self.credentials.password)
    }
}

/// Turn a non-2xx response into an error carrying ClickHouse's exception text.
async fn check(resp: Response) -> Result<String> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .context("reading ClickHouse response body")?;
    if !status.is_success() {
        bail!("ClickHouse returned {}: {}", status, text.trim());
    }
    Ok(text)
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "\\`"))
}

/// Builds INSERT INTO <table> (<quoted columns>) FORMAT Parquet.
pub fn insert_query(table: &str, schema: &ArrowSchema) -> String {
    let cols: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect();
    format!("INSERT INTO {} ({}) FORMAT Parquet", table, cols.join(", "))
}

/// Serialize a batch into a complete Parquet file held in memory.
pub fn encode_parquet(batch: &RecordBatch) -> Result<Vec<u8>> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), Some(props))
        .context("creating Parquet writer")?;
    writer.write(batch).context("writing Parquet batch")?;
    writer.into_inner().context("finishing Parquet buffer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, ArrayRef, StringArray, UInt64Array};
    use arrow::datatypes::{DataType, Field};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;
    use wiremock::matchers::{body_string, header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Credentials {
        Credentials {
            user: "admin".into(),
            password: "secret".into(),
        }
    }

    fn sample_batch() -> Result<RecordBatch> {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("population", DataType::UInt64, true),
        ]));
        let cols: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["Aruba", "Namibia"])),
            Arc::new(UInt64Array::from(vec![Some(106_537), None])),
        ];
        Ok(RecordBatch::try_new(schema, cols)?)
    }

    async fn mock_version(server: &MockServer) {
        Mock::given(method("POST"))
            .and(header(USER_HEADER, "admin"))
            .and(header(KEY_HEADER, "secret"))
            .and(body_string("SELECT version()"))
            .respond_with(ResponseTemplate::new(200).set_body_string("24.3.1.2672\n"))
            .mount(server)
            .await;
    }

    #[test]
    fn insert_query_lists_quoted_columns() -> Result<()> {
        let batch = sample_batch()?;
        assert_eq!(
            insert_query("datasets.t", &batch.schema()),
            "INSERT INTO datasets.t (`name`, `population`) FORMAT Parquet"
        );
        Ok(())
    }

    #[test]
    fn encode_parquet_is_readable() -> Result<()> {
        let batch = sample_batch()?;
        let buf = encode_parquet(&batch)?;
        let reader =
            ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(buf))?.build()?;
        let rows: usize = reader
            .map(|b| b.map(|b| b.num_rows()))
            .sum::<std::result::Result<usize, _>>()?;
        assert_eq!(rows, 2);
        Ok(())
    }

    #[tokio::test]
    async fn connect_checks_version_with_credentials() -> Result<()> {
        let server = MockServer::start().await;
        mock_version(&server).await;

        let client = ClickHouse::connect(Url::parse(&server.uri())?, creds()).await?;
        assert_eq!(client.command("SELECT version()").await?, "24.3.1.2672");
        Ok(())
    }

    #[tokio::test]
    async fn connect_fails_on_rejected_login() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "Code: 516. DB::Exception: admin: Authentication failed",
            ))
            .mount(&server)
            .await;

        let err = match ClickHouse::connect(Url::parse(&server.uri())?, creds()).await {
            Ok(_) => panic!("connect should fail"),
            Err(e) => format!("{:#}", e),
        };
        assert!(err.contains("Authentication failed"), "{}", err);
        Ok(())
    }

    #[tokio::test]
    async fn insert_batch_posts_parquet() -> Result<()> {
        let server = MockServer::start().await;
        mock_version(&server).await;
        Mock::given(method("POST"))
            .and(query_param(
                "query",
                "INSERT INTO datasets.t (`name`, `population`) FORMAT Parquet",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClickHouse::connect(Url::parse(&server.uri())?, creds()).await?;
        client.insert_batch("datasets.t", &sample_batch()?).await?;

        let requests = server.received_requests().await.unwrap_or_default();
        let insert = requests
            .iter()
            .find(|r| r.url.query().is_some())
            .expect("insert request");
        let reader =
            ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(insert.body.clone()))?
                .build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let names = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("utf8 column");
        assert_eq!(names.value(1), "Namibia");
        assert!(batches[0].column(1).is_null(1));
        Ok(())
    }
}
