//! Transaction service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared_types::{Address, U256};
use ss_04_hash_verifier::SafeTxData;
use tracing::debug;

use crate::domain::{
    DelegateRecord, Estimation, EstimationRequest, Page, PageRequest, ProposedTransaction,
    SafeInfo, ServiceTransaction,
};
use crate::errors::ServiceError;
use crate::ports::TransactionService;

pub struct HttpTransactionService {
    client: Client,
    base_url: String,
}

impl HttpTransactionService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ServiceError::Http {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    async fn checked(url: &str, response: Result<Response, reqwest::Error>) -> Result<Response, ServiceError> {
        let response = response.map_err(|e| ServiceError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get<R: DeserializeOwned>(&self, url: String, query: &[(&str, String)]) -> Result<R, ServiceError> {
        debug!(url = %url, "GET");
        let response = Self::checked(&url, self.client.get(&url).query(query).send().await).await?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("{url}: {e}")))
    }

    fn page_query(page: PageRequest) -> Vec<(&'static str, String)> {
        vec![
            ("limit", page.limit.to_string()),
            ("offset", page.offset.to_string()),
        ]
    }
}

#[async_trait]
impl TransactionService for HttpTransactionService {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, ServiceError> {
        self.get(self.url(&format!("/v1/safes/{safe:#x}/")), &[]).await
    }

    async fn delegates(
        &self,
        safe: Address,
        page: PageRequest,
    ) -> Result<Page<DelegateRecord>, ServiceError> {
        let mut query = Self::page_query(page);
        query.push(("safe", format!("{safe:#x}")));
        self.get(self.url("/v2/delegates/"), &query).await
    }

    async fn multisig_transactions(
        &self,
        safe: Address,
        page: PageRequest,
    ) -> Result<Page<ServiceTransaction>, ServiceError> {
        let mut query = Self::page_query(page);
        query.push(("ordering", "nonce".to_string()));
        self.get(
            self.url(&format!("/v1/safes/{safe:#x}/multisig-transactions/")),
            &query,
        )
        .await
    }

    async fn estimate(&self, safe: Address, tx: &SafeTxData) -> Result<U256, ServiceError> {
        let url = self.url(&format!(
            "/v1/safes/{safe:#x}/multisig-transactions/estimations/"
        ));
        debug!(url = %url, "POST estimation");
        let response = Self::checked(
            &url,
            self.client
                .post(&url)
                .json(&EstimationRequest::from(tx))
                .send()
                .await,
        )
        .await?;
        let estimation: Estimation = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("{url}: {e}")))?;
        Ok(estimation.safe_tx_gas)
    }

    async fn propose(&self, proposal: &ProposedTransaction) -> Result<(), ServiceError> {
        let url = self.url(&format!(
            "/v1/safes/{:#x}/multisig-transactions/",
            proposal.safe
        ));
        debug!(url = %url, nonce = proposal.nonce, "POST proposal");
        Self::checked(&url, self.client.post(&url).json(proposal).send().await).await?;
        Ok(())
    }
}
