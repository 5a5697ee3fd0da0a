//! gRPC implementation of the coordinator link port.
//!
//! Dials the coordinator, opens the `EstablishTokiameLink` bidirectional
//! stream, and adapts its two halves to [`EnvelopeSink`] / [`EnvelopeSource`].
//! A `grpcs://` address prefix selects TLS (rustls, which negotiates TLS 1.2
//! or newer); `grpc://` or a bare address dials in the clear.

use super::convert::{decode_inbound, encode_outbound};
use super::pb;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, ClientTlsConfig};
use tracing::{debug, info, warn};
use tokiame_application::{
    CoordinatorLink, EnvelopeSink, EnvelopeSource, LinkError, LinkResult,
};
use tokiame_domain::{InboundEnvelope, OutboundEnvelope};

/// Buffer between the sink adapter and the request stream handed to tonic.
/// Kept small so the outbound queue stays the place where backpressure acts.
const REQUEST_STREAM_BUFFER: usize = 16;

pub struct GrpcCoordinatorLink {
    address: String,
    namespace: String,
}

impl GrpcCoordinatorLink {
    pub fn new(address: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            namespace: namespace.into(),
        }
    }
}

/// Splits a coordinator address into a dialable URI and a TLS flag.
fn parse_endpoint(address: &str) -> (String, bool) {
    if let Some(target) = address.strip_prefix("grpcs://") {
        (format!("https://{target}"), true)
    } else if let Some(target) = address.strip_prefix("grpc://") {
        (format!("http://{target}"), false)
    } else {
        (format!("http://{address}"), false)
    }
}

#[async_trait]
impl CoordinatorLink for GrpcCoordinatorLink {
    async fn connect(&self) -> LinkResult<(Box<dyn EnvelopeSink>, Box<dyn EnvelopeSource>)> {
        let (target, tls) = parse_endpoint(&self.address);
        debug!(%target, tls, "dialing coordinator");

        let mut endpoint = Channel::from_shared(target.clone())
            .map_err(|e| LinkError::InvalidAddress(e.to_string()))?;
        if tls {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| LinkError::Dial(e.to_string()))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| LinkError::Dial(format!("dial to '{target}' failed: {e}")))?;

        let mut client = pb::TokilakeCoordinatorClient::new(channel);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_STREAM_BUFFER);
        let response = client
            .establish_tokiame_link(ReceiverStream::new(request_rx))
            .await
            .map_err(|status| LinkError::OpenStream(status.to_string()))?;

        info!(
            address = %self.address,
            tls,
            "bidirectional stream established"
        );

        let sink = GrpcSink {
            requests: request_tx,
            namespace: self.namespace.clone(),
        };
        let source = GrpcSource {
            inbound: response.into_inner(),
        };
        Ok((Box::new(sink), Box::new(source)))
    }
}

struct GrpcSink {
    requests: mpsc::Sender<pb::TokiameMessage>,
    namespace: String,
}

#[async_trait]
impl EnvelopeSink for GrpcSink {
    async fn send(&mut self, envelope: OutboundEnvelope) -> LinkResult<()> {
        let message = encode_outbound(envelope, &self.namespace);
        self.requests
            .send(message)
            .await
            .map_err(|_| LinkError::Send("request stream closed".to_string()))
    }
}

struct GrpcSource {
    inbound: tonic::codec::Streaming<pb::TokilakeMessage>,
}

#[async_trait]
impl EnvelopeSource for GrpcSource {
    async fn recv(&mut self) -> LinkResult<Option<InboundEnvelope>> {
        loop {
            match self.inbound.message().await {
                Ok(Some(message)) => {
                    let task_id = message.task_id.clone();
                    match decode_inbound(message) {
                        Some(envelope) => return Ok(Some(envelope)),
                        None => {
                            warn!(task_id, "unknown inbound payload, dropping");
                            continue;
                        }
                    }
                }
                Ok(None) => return Ok(None),
                Err(status) => return Err(LinkError::Recv(status.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grpcs_scheme_selects_tls() {
        assert_eq!(
            parse_endpoint("grpcs://lake.example.com:443"),
            ("https://lake.example.com:443".to_string(), true)
        );
    }

    #[test]
    fn grpc_scheme_is_stripped_and_insecure() {
        assert_eq!(
            parse_endpoint("grpc://localhost:50051"),
            ("http://localhost:50051".to_string(), false)
        );
    }

    #[test]
    fn bare_address_defaults_to_insecure() {
        assert_eq!(
            parse_endpoint("localhost:50051"),
            ("http://localhost:50051".to_string(), false)
        );
    }
}
