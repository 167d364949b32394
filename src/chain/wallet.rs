//! Wallet seam.
//!
//! Key management and signing stay outside this crate. A wallet only has to
//! report its account and turn an entry-function payload into a submitted
//! transaction hash.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::types::XenithError;

/// `entry_function_payload` as accepted by wallet adapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    pub fn new(function: String, arguments: Vec<Value>) -> Self {
        Self {
            kind: "entry_function_payload",
            function,
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Prompt for a connection and return the account address.
    async fn connect(&self) -> Result<String, XenithError>;

    /// Connected account, if any.
    async fn account(&self) -> Result<Option<String>, XenithError>;

    /// Sign and submit; returns the transaction hash.
    async fn sign_and_submit(&self, payload: EntryFunctionPayload) -> Result<String, XenithError>;
}
