use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use uploads_core::config::RelayConfig;
use uploads_core::contract::NotificationEnvelope;
use uploads_core::response::ApiGatewayResponse;
use uploads_lambda::adapters::queue::QueueAcknowledger;
use uploads_lambda::adapters::topic::TopicPublisher;
use uploads_lambda::handlers::relay::handle_relay_event;

struct SnsTopicPublisher {
    sns_client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl TopicPublisher for SnsTopicPublisher {
    fn publish(&self, envelope: &NotificationEnvelope) -> Result<(), String> {
        let client = self.sns_client.clone();
        let topic_arn = self.topic_arn.clone();
        let subject = envelope.subject.clone();
        let message = envelope.message.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .publish()
                    .topic_arn(topic_arn)
                    .subject(subject)
                    .message(message)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to publish notification: {error}"))
            })
        })
    }
}

struct SqsQueueAcknowledger {
    sqs_client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl QueueAcknowledger for SqsQueueAcknowledger {
    fn delete_message(&self, receipt_handle: &str) -> Result<(), String> {
        let client = self.sqs_client.clone();
        let queue_url = self.queue_url.clone();
        let receipt_handle = receipt_handle.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_message()
                    .queue_url(queue_url)
                    .receipt_handle(receipt_handle)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete queue message: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = RelayConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let publisher = SnsTopicPublisher {
        sns_client: aws_sdk_sns::Client::new(&aws_config),
        topic_arn: config.topic_arn,
    };
    let acknowledger = SqsQueueAcknowledger {
        sqs_client: aws_sdk_sqs::Client::new(&aws_config),
        queue_url: config.queue_url,
    };

    Ok(handle_relay_event(event.payload, &publisher, &acknowledger))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
