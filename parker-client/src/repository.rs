//! Spot repository: one network round trip per operation.
//!
//! Search is best-effort and never fails: any transport, status or decode problem yields
//! an empty list. Mutations (report, status update, sign-up, login) propagate every error.

use std::time::Duration;

use async_trait::async_trait;
use parker_core::{AuthCredential, AuthResult, Coordinate, ParkingSpot, SpotRecord};
use tracing::{debug, warn};

use crate::error::{AuthError, NetworkError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// Request against the backend: path relative to the base URL plus query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP client seam. Production uses reqwest; tests substitute a fake.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Trailing slashes on `base_url` are dropped; request paths carry the leading one.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };
        let resp = builder.query(&request.query).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Network-facing spot and account operations.
#[async_trait]
pub trait SpotRepository: Send + Sync {
    /// Nearest spots to `center`, at most `limit`. Empty on any failure.
    async fn search_spots(&self, center: Coordinate, limit: usize) -> Vec<ParkingSpot>;
    /// Crowd report: the spot nearest `coord` is open.
    async fn report_spot_available(&self, coord: Coordinate) -> Result<(), NetworkError>;
    /// Status update for the spot nearest `coord`.
    async fn update_spot_status(&self, coord: Coordinate) -> Result<(), NetworkError>;
    async fn sign_up(&self, phone: &str, passcode: &str) -> Result<AuthResult, AuthError>;
    async fn login(&self, phone: &str, passcode: &str) -> Result<AuthResult, AuthError>;
}

pub struct HttpSpotRepository<T> {
    transport: T,
}

impl<T: HttpTransport> HttpSpotRepository<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let path = request.path;
        let resp = self.transport.execute(request).await?;
        if !resp.is_success() {
            return Err(NetworkError::Server {
                status: resp.status,
            });
        }
        debug!(path, status = resp.status, "request ok");
        Ok(resp)
    }

    async fn try_search(
        &self,
        center: Coordinate,
        limit: usize,
    ) -> Result<Vec<ParkingSpot>, NetworkError> {
        let resp = self
            .send(HttpRequest {
                method: Method::Get,
                path: "/closest-parking-lots",
                query: with_coordinate(center, vec![("limit", limit.to_string())]),
            })
            .await?;
        let records: Vec<SpotRecord> = serde_json::from_slice(&resp.body)?;
        Ok(records.into_iter().take(limit).map(ParkingSpot::from).collect())
    }

    async fn authenticate(
        &self,
        path: &'static str,
        phone: &str,
        passcode: &str,
    ) -> Result<AuthResult, AuthError> {
        if phone.trim().is_empty() {
            return Err(AuthError::MissingField("phone"));
        }
        if passcode.is_empty() {
            return Err(AuthError::MissingField("passcode"));
        }
        let credential = AuthCredential::derive(phone.trim(), passcode);
        let resp = self
            .send(HttpRequest {
                method: Method::Post,
                path,
                query: vec![
                    ("phone", credential.phone_hash().to_string()),
                    ("passhash", credential.pass_hash().to_string()),
                ],
            })
            .await?;
        let result: AuthResult = serde_json::from_slice(&resp.body).map_err(NetworkError::from)?;
        if !result.success {
            debug!(path, "account rejected by server");
        }
        Ok(result)
    }
}

fn with_coordinate(
    coord: Coordinate,
    mut rest: Vec<(&'static str, String)>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("latitude", coord.latitude.to_string()),
        ("longitude", coord.longitude.to_string()),
    ];
    query.append(&mut rest);
    query
}

#[async_trait]
impl<T: HttpTransport> SpotRepository for HttpSpotRepository<T> {
    async fn search_spots(&self, center: Coordinate, limit: usize) -> Vec<ParkingSpot> {
        match self.try_search(center, limit).await {
            Ok(spots) => spots,
            Err(e) => {
                warn!(error = %e, "spot search failed, returning no spots");
                Vec::new()
            }
        }
    }

    async fn report_spot_available(&self, coord: Coordinate) -> Result<(), NetworkError> {
        self.send(HttpRequest {
            method: Method::Post,
            path: "/report-open-spot",
            query: with_coordinate(coord, Vec::new()),
        })
        .await?;
        Ok(())
    }

    async fn update_spot_status(&self, coord: Coordinate) -> Result<(), NetworkError> {
        self.send(HttpRequest {
            method: Method::Put,
            path: "/update-parking-status",
            query: with_coordinate(coord, Vec::new()),
        })
        .await?;
        Ok(())
    }

    async fn sign_up(&self, phone: &str, passcode: &str) -> Result<AuthResult, AuthError> {
        self.authenticate("/signup", phone, passcode).await
    }

    async fn login(&self, phone: &str, passcode: &str) -> Result<AuthResult, AuthError> {
        self.authenticate("/login", phone, passcode).await
    }
}
