//! One authenticated portal session.
//!
//! Bundles the cookie-keeping transport with the endpoint configuration and
//! the response classifier. Every sequencer (auth, calendar, menu, order)
//! borrows it; the cookie jar inside is the session state.

use crate::classify::ResponseClassifier;
use crate::config::CanteenConfig;
use crate::error::CanteenError;
use crate::transport::{Page, PageRequest, Transport};

/// Transport, endpoints and classifier for one logged-in user.
///
/// Clones share the cookie jar, so a clone stays in the same portal session.
#[derive(Debug, Clone)]
pub struct Session {
    transport: Transport,
    config: CanteenConfig,
    classifier: ResponseClassifier,
}

impl Session {
    /// Build the transport for `config`.
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(config: CanteenConfig, classifier: ResponseClassifier) -> Result<Self, CanteenError> {
        Ok(Self {
            transport: Transport::new(&config)?,
            config,
            classifier,
        })
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &CanteenConfig {
        &self.config
    }

    /// Classifier applied to every response.
    pub fn classifier(&self) -> &ResponseClassifier {
        &self.classifier
    }

    /// Underlying HTTP transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Send one request through the shared cookie jar.
    pub(crate) async fn send(&self, request: PageRequest) -> Result<Page, CanteenError> {
        self.transport.send(request).await
    }
}
