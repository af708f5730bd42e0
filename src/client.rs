use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiErrorResponse, StorageError};
use crate::metadata::{HeadObjectOutput, StorageMetadata};
use crate::rest_types::{
    DeleteParams, DeleteResponse, GetUrlParams, MetadataResponse, PresignedUrl,
    PresignedUrlParams, PresignedUrlResponse, UploadParams, UploadResponse,
};
use crate::upload::{UploadFile, UploadString};

const FILES_ROUTE: &str = "files/";
const PRESIGNED_URL_SEGMENT: &str = "presignedurl";
const FILE_FIELD: &str = "file";
const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Credentials attached to every request.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `x-hasura-admin-secret: {secret}`
    AdminSecret(String),
    /// `Authorization: Bearer {token}`
    Bearer(String),
}

#[derive(Clone, Debug)]
pub struct StorageClient {
    client: Client,
    base_url: Url,
    auth: Option<Auth>,
}

impl StorageClient {
    pub fn new(storage_url: Url, auth: Option<Auth>) -> Self {
        Self::with_client(Client::new(), storage_url, auth)
    }

    pub fn with_client(client: Client, mut storage_url: Url, auth: Option<Auth>) -> Self {
        if !storage_url.path().ends_with('/') {
            let path = format!("{}/", storage_url.path());
            storage_url.set_path(&path);
        }

        Self {
            client,
            base_url: storage_url,
            auth,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(Auth::AdminSecret(secret)) => request.header(ADMIN_SECRET_HEADER, secret),
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `files/{file_id}[/{segment}]`, with the id encoded as a single path segment.
    fn file_url(&self, file_id: &str, segment: Option<&str>) -> Result<Url, StorageError> {
        let mut url = self.base_url.join(FILES_ROUTE)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.pop_if_empty().push(file_id);
            if let Some(segment) = segment {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    pub async fn upload(&self, params: UploadParams) -> UploadResponse {
        if params.file.is_empty() {
            return Err(StorageError::EmptyFile);
        }

        let url = self.base_url.join(FILES_ROUTE)?;
        let headers = params.headers().to_header_map()?;

        let UploadFile {
            bytes,
            file_name,
            content_type,
        } = params.file;
        let size = bytes.len();

        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(content_type) = content_type {
            part = part.mime_str(&content_type)?;
        }
        let form = Form::new().part(FILE_FIELD, part);

        debug!(%url, size, "uploading file");
        let response = self
            .apply_auth(self.client.post(url))
            .headers(headers)
            .multipart(form)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let head: HeadObjectOutput = response.json().await?;
        Ok(head)
    }

    pub async fn upload_string(&self, upload: UploadString) -> UploadResponse {
        let params = upload.into_upload_params()?;
        self.upload(params).await
    }

    /// Public location of a file. Nothing is sent; access rules still apply
    /// when the URL is fetched.
    pub fn get_public_url(&self, params: &GetUrlParams) -> Result<Url, StorageError> {
        self.file_url(&params.file_id, None)
    }

    pub async fn get_presigned_url(&self, params: &PresignedUrlParams) -> PresignedUrlResponse {
        let url = self.file_url(&params.file_id, Some(PRESIGNED_URL_SEGMENT))?;

        debug!(%url, "requesting presigned url");
        let response = self.apply_auth(self.client.get(url)).send().await?;
        let response = error_for_status(response).await?;

        let presigned: PresignedUrl = response.json().await?;
        Ok(presigned)
    }

    pub async fn delete(&self, params: &DeleteParams) -> DeleteResponse {
        let url = self.file_url(&params.file_id, None)?;

        debug!(%url, "deleting file");
        let response = self.apply_auth(self.client.delete(url)).send().await?;
        error_for_status(response).await?;

        Ok(())
    }

    /// Full `HeadObject` view of a file, read from the response headers.
    pub async fn head(&self, file_id: &str) -> Result<HeadObjectOutput, StorageError> {
        let url = self.file_url(file_id, None)?;

        debug!(%url, "fetching file headers");
        let response = self.apply_auth(self.client.head(url)).send().await?;
        let response = error_for_status(response).await?;

        Ok(HeadObjectOutput::from_headers(response.headers()))
    }

    pub async fn get_metadata(&self, file_id: &str) -> MetadataResponse {
        let head = self.head(file_id).await?;
        Ok(StorageMetadata::from_head(file_id, &head))
    }
}

async fn error_for_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            debug!(%status, error = %err, "unable to read error response body");
            String::new()
        }
    };
    let message = api_error_message(status, &body);

    warn!(%status, %message, "storage request failed");
    Err(StorageError::Api { status, message })
}

/// Picks the most useful message from an error response body, falling back
/// to the status reason when the body is empty or unreadable.
fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
