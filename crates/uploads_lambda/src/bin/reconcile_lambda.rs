use std::time::Duration;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use uploads_core::config::ReconcileConfig;
use uploads_core::response::ApiGatewayResponse;
use uploads_lambda::adapters::catalog::MySqlCatalogConnector;
use uploads_lambda::adapters::object_store::{ObjectStatProbe, ProbeOutcome};
use uploads_lambda::handlers::reconcile::handle_reconcile_event;

struct S3ObjectStatProbe {
    s3_client: aws_sdk_s3::Client,
    bucket: String,
    probe_timeout: Duration,
}

impl ObjectStatProbe for S3ObjectStatProbe {
    fn head_object(&self, key: &str) -> Result<ProbeOutcome, String> {
        let client = self.s3_client.clone();
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let probe_timeout = self.probe_timeout;

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let sent = client
                    .head_object()
                    .bucket(bucket)
                    .key(object_key.clone())
                    .send();

                let response = tokio::time::timeout(probe_timeout, sent)
                    .await
                    .map_err(|_| format!("probe timed out for object {object_key}"))?;

                match response {
                    Ok(output) => Ok(ProbeOutcome::Found {
                        size: output.content_length().unwrap_or_default(),
                    }),
                    Err(error) => {
                        let not_found = error
                            .as_service_error()
                            .is_some_and(|service_error| service_error.is_not_found());
                        if not_found {
                            Ok(ProbeOutcome::Missing)
                        } else {
                            Err(format!("failed to probe object {object_key}: {error}"))
                        }
                    }
                }
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = ReconcileConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let probe = S3ObjectStatProbe {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
        bucket: config.bucket.clone(),
        probe_timeout: Duration::from_secs(config.probe_timeout_secs),
    };
    let connector = MySqlCatalogConnector::from_config(&config);

    handle_reconcile_event(&event.payload, &config, &connector, &probe)
        .map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
