//! Injected host capabilities.
//!
//! The surrounding site talks to a session backend, a payment gateway, and
//! an optional third-party payment SDK. None of that belongs to the visual
//! core, so the stage consumes them as injected capabilities: narrow traits
//! with inert defaults, and an explicit not-yet-available state for the SDK
//! instead of probing an untyped global at call time.

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("payment SDK has not been injected by the host yet")]
    SdkUnavailable,
    #[error("capability '{0}' is not wired in this host")]
    NotWired(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
}

/// Read-only view of the authenticated session.
pub trait SessionService {
    fn current_user(&self) -> Option<UserProfile>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount_cents: u64,
    pub reference: String,
}

/// Parameters the host should redirect the visitor with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParameters {
    pub url: String,
    pub token: String,
}

/// Server-side payment initiation.
pub trait PaymentGateway {
    fn initiate_payment(&self, request: &PaymentRequest) -> Result<RedirectParameters, CapabilityError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkOpenOptions {
    pub order_token: String,
}

/// The third-party checkout overlay, when the host page has injected it.
pub trait PaymentSdk {
    fn open(&self, options: &SdkOpenOptions) -> Result<(), CapabilityError>;
}

/// Injection slot for the SDK with an explicit pending state.
pub enum SdkHandle {
    NotYetAvailable,
    Ready(Box<dyn PaymentSdk>),
}

impl SdkHandle {
    pub fn open(&self, options: &SdkOpenOptions) -> Result<(), CapabilityError> {
        match self {
            SdkHandle::NotYetAvailable => Err(CapabilityError::SdkUnavailable),
            SdkHandle::Ready(sdk) => sdk.open(options),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SdkHandle::Ready(_))
    }
}

/// Everything the stage may ask of its embedding host.
pub struct HostCapabilities {
    pub session: Box<dyn SessionService>,
    pub payments: Box<dyn PaymentGateway>,
    pub sdk: SdkHandle,
}

impl HostCapabilities {
    /// A fully inert host: anonymous session, no gateway, no SDK.
    ///
    /// The standalone stage binary runs with this; an embedding site swaps
    /// in live implementations.
    pub fn detached() -> Self {
        Self {
            session: Box::new(AnonymousSession),
            payments: Box::new(UnwiredGateway),
            sdk: SdkHandle::NotYetAvailable,
        }
    }
}

struct AnonymousSession;

impl SessionService for AnonymousSession {
    fn current_user(&self) -> Option<UserProfile> {
        None
    }
}

struct UnwiredGateway;

impl PaymentGateway for UnwiredGateway {
    fn initiate_payment(&self, _request: &PaymentRequest) -> Result<RedirectParameters, CapabilityError> {
        Err(CapabilityError::NotWired("payment gateway"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn detached_host_is_anonymous_and_unwired() {
        let host = HostCapabilities::detached();
        assert!(host.session.current_user().is_none());
        assert!(!host.sdk.is_ready());
        let request = PaymentRequest {
            amount_cents: 4200,
            reference: "order-1".into(),
        };
        assert!(matches!(
            host.payments.initiate_payment(&request),
            Err(CapabilityError::NotWired(_))
        ));
    }

    #[test]
    fn sdk_open_fails_until_injected() {
        let pending = SdkHandle::NotYetAvailable;
        let result = pending.open(&SdkOpenOptions::default());
        assert!(matches!(result, Err(CapabilityError::SdkUnavailable)));
    }

    #[test]
    fn injected_sdk_receives_open_calls() {
        struct RecordingSdk(RefCell<Vec<String>>);
        impl PaymentSdk for RecordingSdk {
            fn open(&self, options: &SdkOpenOptions) -> Result<(), CapabilityError> {
                self.0.borrow_mut().push(options.order_token.clone());
                Ok(())
            }
        }

        let sdk = SdkHandle::Ready(Box::new(RecordingSdk(RefCell::new(Vec::new()))));
        assert!(sdk.is_ready());
        let options = SdkOpenOptions {
            order_token: "tok_123".into(),
        };
        assert!(sdk.open(&options).is_ok());
    }
}
