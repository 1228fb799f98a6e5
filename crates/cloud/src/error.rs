use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CloudError {
    #[snafu(display("document store request failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("document store returned status {status} on `{stage}`: {body}"))]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode document store payload on `{stage}`: {source}"))]
    DecodePayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("document '{id}' in '{collection}' carries malformed fields: {source}"))]
    MalformedDocument {
        stage: &'static str,
        collection: &'static str,
        id: String,
        source: serde_json::Error,
    },
}

pub type CloudResult<T> = Result<T, CloudError>;
