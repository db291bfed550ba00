use async_trait::async_trait;
use curricula_core::models::{
    AttachResponse, DetachResponse, ErrorBody, MetadataPatch, ProgramTemplates, ReorderResponse,
    Role, UpdateMetadataResponse,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ClientError;

/// The HTTP calls the optimistic queues make. Implemented over `reqwest` by
/// [`HttpTransport`]; tests substitute scripted fakes.
#[async_trait]
pub trait LinkTransport: Send + Sync + 'static {
    async fn load_panel(&self, program_id: Uuid) -> Result<ProgramTemplates, ClientError>;

    async fn attach(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        overrides: &MetadataPatch,
    ) -> Result<AttachResponse, ClientError>;

    async fn detach(&self, program_id: Uuid, template_id: Uuid)
        -> Result<DetachResponse, ClientError>;

    async fn update_metadata(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        patch: &MetadataPatch,
    ) -> Result<UpdateMetadataResponse, ClientError>;

    async fn reorder(&self, program_id: Uuid, order: &[Uuid])
        -> Result<ReorderResponse, ClientError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    user_id: Uuid,
    roles: Vec<Role>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, user_id: Uuid, roles: Vec<Role>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
            roles,
        }
    }

    fn templates_url(&self, program_id: Uuid) -> String {
        format!("{}/programs/{}/templates", self.base_url, program_id)
    }

    fn identify(&self, request: RequestBuilder) -> RequestBuilder {
        let roles = self
            .roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",");
        request
            .header("x-user-id", self.user_id.to_string())
            .header("x-user-roles", roles)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.identify(request).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }
    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    Err(ClientError::Http {
        status: status.as_u16(),
        code: body
            .as_ref()
            .map(|b| b.error.clone())
            .unwrap_or_else(|| "http_error".to_string()),
        message: body.and_then(|b| b.message).or(Some(text)),
    })
}

#[async_trait]
impl LinkTransport for HttpTransport {
    async fn load_panel(&self, program_id: Uuid) -> Result<ProgramTemplates, ClientError> {
        self.send(self.client.get(self.templates_url(program_id)))
            .await
    }

    async fn attach(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        overrides: &MetadataPatch,
    ) -> Result<AttachResponse, ClientError> {
        let mut body = overrides.to_json();
        body.insert("template_id".into(), json!(template_id));
        self.send(
            self.client
                .post(self.templates_url(program_id))
                .json(&Value::Object(body)),
        )
        .await
    }

    async fn detach(
        &self,
        program_id: Uuid,
        template_id: Uuid,
    ) -> Result<DetachResponse, ClientError> {
        let url = format!("{}/{}", self.templates_url(program_id), template_id);
        self.send(self.client.delete(url)).await
    }

    async fn update_metadata(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        patch: &MetadataPatch,
    ) -> Result<UpdateMetadataResponse, ClientError> {
        let url = format!("{}/{}", self.templates_url(program_id), template_id);
        self.send(self.client.patch(url).json(&Value::Object(patch.to_json())))
            .await
    }

    async fn reorder(
        &self,
        program_id: Uuid,
        order: &[Uuid],
    ) -> Result<ReorderResponse, ClientError> {
        let url = format!("{}/reorder", self.templates_url(program_id));
        self.send(self.client.post(url).json(&json!({ "order": order })))
            .await
    }
}
