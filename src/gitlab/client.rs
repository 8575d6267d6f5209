use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ExporterError, Result};

use super::types::{Pipeline, PipelineInfo, Project};

const PAGE_SIZE: usize = 100;

/// GitLab REST API v4 client.
///
/// Authenticates with a `PRIVATE-TOKEN` header when a token is configured.
/// All operations return typed responses; non-2xx responses are surfaced as
/// [`ExporterError::Api`].
pub struct GitLabClient {
    client: Client,
    base_url: Url,
}

impl GitLabClient {
    /// Create a new GitLab API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitLab instance base URL (e.g. "https://gitlab.com")
    /// * `token` - Optional personal access token
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the base URL or token is malformed.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| ExporterError::Config(format!("invalid GitLab token: {e}")))?;
            headers.insert("PRIVATE-TOKEN", value);
        }

        let client = Client::builder()
            .user_agent(concat!("cipulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ExporterError::Config(format!("failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| ExporterError::Config(format!("invalid GitLab base URL: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(ExporterError::Config(format!(
                "invalid GitLab base URL: {base_url}"
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Build an `/api/v4` URL from path segments, percent-encoding each one.
    /// A path like "group/project" becomes a single `group%2Fproject` segment.
    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v4"]).extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(ExporterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch a project by its full path (e.g. "group/project").
    ///
    /// A 404 maps to [`ExporterError::ProjectNotFound`], which callers use to
    /// distinguish a missing/inaccessible project from transient API trouble.
    pub async fn project(&self, name: &str) -> Result<Project> {
        let url = self.api_url(&["projects", name]);

        match self.get_json(url).await {
            Err(ExporterError::Api { status: 404, .. }) => {
                Err(ExporterError::ProjectNotFound(name.to_string()))
            }
            other => other,
        }
    }

    /// List pipelines for a project filtered by ref.
    ///
    /// GitLab returns the listing newest-first; callers rely on that order
    /// and only ever inspect the head of the list.
    pub async fn pipelines(&self, project_id: u64, ref_: &str) -> Result<Vec<PipelineInfo>> {
        let mut url = self.api_url(&["projects", &project_id.to_string(), "pipelines"]);
        url.query_pairs_mut().append_pair("ref", ref_);

        self.get_json(url).await
    }

    /// Fetch full detail for a single pipeline.
    pub async fn pipeline(&self, project_id: u64, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.api_url(&[
            "projects",
            &project_id.to_string(),
            "pipelines",
            &pipeline_id.to_string(),
        ]);

        self.get_json(url).await
    }

    /// List all projects owned by the configured token, following pagination
    /// until a short page signals the end.
    pub async fn owned_projects(&self) -> Result<Vec<Project>> {
        let mut all_projects = Vec::new();
        let mut page = 1;

        loop {
            let mut url = self.api_url(&["projects"]);
            url.query_pairs_mut()
                .append_pair("owned", "true")
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());

            let projects: Vec<Project> = self.get_json(url).await?;
            let fetched = projects.len();
            all_projects.extend(projects);

            if fetched < PAGE_SIZE {
                break;
            }

            page += 1;
        }

        Ok(all_projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> GitLabClient {
        GitLabClient::new(&server.url(), Some("test-token")).unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitLabClient::new("not a url", None);
        assert!(matches!(result, Err(ExporterError::Config(_))));
    }

    #[tokio::test]
    async fn test_project_encodes_path_and_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/group%2Fproject")
            .match_header("PRIVATE-TOKEN", "test-token")
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 42, "path_with_namespace": "group/project"}"#)
            .create_async()
            .await;

        let project = client_for(&server).project("group/project").await.unwrap();

        assert_eq!(project.id, 42);
        assert_eq!(project.path_with_namespace, "group/project");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_project_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/group%2Fmissing")
            .with_status(404)
            .with_body(r#"{"message": "404 Project Not Found"}"#)
            .create_async()
            .await;

        let result = client_for(&server).project("group/missing").await;

        match result {
            Err(ExporterError::ProjectNotFound(name)) => assert_eq!(name, "group/missing"),
            other => panic!("expected ProjectNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/group%2Fproject")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let result = client_for(&server).project("group/project").await;

        match result {
            Err(ExporterError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pipelines_filters_by_ref() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/42/pipelines")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": 102, "status": "running", "ref": "main"},
                    {"id": 101, "status": "success", "ref": "main"}
                ]"#,
            )
            .create_async()
            .await;

        let pipelines = client_for(&server).pipelines(42, "main").await.unwrap();

        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].id, 102);
        assert_eq!(pipelines[0].status, "running");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_pipeline_detail_null_duration() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/pipelines/102")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": 102,
                    "status": "running",
                    "duration": null,
                    "created_at": "2024-05-01T12:00:00.000Z"
                }"#,
            )
            .create_async()
            .await;

        let pipeline = client_for(&server).pipeline(42, 102).await.unwrap();

        assert_eq!(pipeline.id, 102);
        assert_eq!(pipeline.duration, None);
    }

    #[tokio::test]
    async fn test_owned_projects_single_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("owned".into(), "true".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": 1, "path_with_namespace": "me/alpha"},
                    {"id": 2, "path_with_namespace": "me/beta"}
                ]"#,
            )
            .create_async()
            .await;

        let projects = client_for(&server).owned_projects().await.unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].path_with_namespace, "me/beta");
    }

    #[tokio::test]
    async fn test_owned_projects_follows_pagination() {
        let mut server = mockito::Server::new_async().await;

        let full_page: Vec<serde_json::Value> = (1..=100)
            .map(|i| serde_json::json!({"id": i, "path_with_namespace": format!("me/p{i}")}))
            .collect();

        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("owned".into(), "true".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&full_page).unwrap())
            .create_async()
            .await;

        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("owned".into(), "true".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": 101, "path_with_namespace": "me/last"}]"#)
            .create_async()
            .await;

        let projects = client_for(&server).owned_projects().await.unwrap();

        assert_eq!(projects.len(), 101);
        assert_eq!(projects[100].path_with_namespace, "me/last");
    }
}
