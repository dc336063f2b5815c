//! Component errors

use fos_dom::{CustomElementError, DomError, SelectorError};
use fos_events::EventError;
use fos_hub::HubError;

/// Errors from defining and creating components
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("custom element definition failed: {0}")]
    Define(#[from] CustomElementError),

    #[error("event binding failed: {0}")]
    Event(#[from] EventError),

    #[error("hub binding failed: {0}")]
    Hub(#[from] HubError),

    #[error("DOM operation failed: {0}")]
    Dom(#[from] DomError),

    #[error("class {class:?} method {method:?} declares invalid selector {selector:?}")]
    InvalidSelector {
        class: String,
        method: String,
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("<{tag}> did not upgrade to {component}")]
    NotUpgraded { tag: String, component: &'static str },
}
